//! Resilient HTML fetcher.
//!
//! ### Rotation
//! - A user agent is drawn from the configured pool on every attempt; a retry
//!   always uses a different one than the first attempt.
//! - Proxies (single or rotated list) are attached by the transport.
//!
//! ### Rendering proxy
//! - Targets on configured JS-heavy domains are sent through the rendering
//!   proxy with the target passed as the `url` query parameter.
//!
//! ### Bot mitigation
//! - A body smaller than `bot.small_body_bytes` carrying a meta-refresh to a
//!   URL with the verification marker is followed once, after a short delay,
//!   sharing the first request's cookie jar. The larger body wins.
//! - If the follow fails or gains nothing the attempt fails with `BotDetected`.
//! - Small bodies without such a redirect are logged and returned.
//!
//! ### Retry
//! - A failed attempt is retried exactly once when allowed.

pub mod agents;
pub mod bot;
pub mod route;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use url::Url;

pub use agents::UserAgentPool;
pub use route::{Route, host_matches};
pub use transport::{OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError};

use prodex_core::Error;
use prodex_core::config::{AppConfig, BotConfig, RenderConfig};

/// Retrieves page HTML for a strategy.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` with a per-attempt `timeout`, retrying once if `allow_retry`.
    async fn fetch(&self, url: &Url, timeout: Duration, allow_retry: bool) -> Result<String, Error>;
}

/// Fetcher built on a [`Transport`].
pub struct FetchClient<T = ReqwestTransport> {
    transport: T,
    agents: UserAgentPool,
    bot: BotConfig,
    render: RenderConfig,
}

impl FetchClient<ReqwestTransport> {
    /// Create a fetch client backed by reqwest.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config)
            .map_err(|e| Error::FetchFailure { url: "(client setup)".into(), reason: e.to_string() })?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> FetchClient<T> {
    /// Create a fetch client over an arbitrary transport.
    pub fn with_transport(transport: T, config: &AppConfig) -> Self {
        Self {
            transport,
            agents: UserAgentPool::new(config.user_agents.clone(), config.user_agent_seed),
            bot: config.bot.clone(),
            render: config.render.clone(),
        }
    }

    /// Get reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn attempt(&self, page: &Url, target: &Url, user_agent: &str, timeout: Duration) -> Result<String, Error> {
        let fail = |e: TransportError| Error::FetchFailure { url: page.to_string(), reason: e.to_string() };

        let jar = Arc::new(Jar::default());
        let request = OutboundRequest {
            url: target.clone(),
            user_agent: user_agent.to_string(),
            cookies: Arc::clone(&jar),
            timeout,
        };
        let first = self.transport.get(&request).await.map_err(fail)?;

        let small = self.bot.small_body_bytes;
        if first.body.len() >= small {
            tracing::debug!(url = %page, bytes = first.body.len(), status = first.status, "fetched");
            return Ok(first.body);
        }

        let redirect = if self.bot.follow_redirects {
            bot::verification_redirect(&first.body, &self.bot.marker)
        } else {
            None
        };

        let Some(redirect) = redirect else {
            tracing::warn!(
                url = %page,
                bytes = first.body.len(),
                "suspiciously small response; request may have been denied"
            );
            return Ok(first.body);
        };

        let redirect_url = match first.final_url.join(&redirect) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %page, target = %redirect, error = %e, "unresolvable verification redirect");
                return Err(Error::BotDetected { url: page.to_string(), bytes: first.body.len() });
            }
        };

        tracing::info!(url = %page, redirect = %redirect_url, "following bot verification redirect");
        tokio::time::sleep(Duration::from_millis(self.bot.redirect_delay_ms)).await;

        let follow = OutboundRequest { url: redirect_url, user_agent: user_agent.to_string(), cookies: jar, timeout };
        match self.transport.get(&follow).await {
            Ok(second) if second.body.len() > first.body.len() => {
                if second.body.len() < small {
                    tracing::warn!(url = %page, bytes = second.body.len(), "verification redirect body is still small");
                }
                tracing::debug!(url = %page, bytes = second.body.len(), "verification redirect succeeded");
                Ok(second.body)
            }
            Ok(second) => {
                tracing::warn!(url = %page, bytes = second.body.len(), "verification redirect gained nothing");
                Err(Error::BotDetected { url: page.to_string(), bytes: first.body.len() })
            }
            Err(e) => {
                tracing::warn!(url = %page, error = %e, "verification redirect failed");
                Err(Error::BotDetected { url: page.to_string(), bytes: first.body.len() })
            }
        }
    }
}

#[async_trait::async_trait]
impl<T: Transport> Fetcher for FetchClient<T> {
    async fn fetch(&self, url: &Url, timeout: Duration, allow_retry: bool) -> Result<String, Error> {
        let (target, timeout) = match route::plan(&self.render, url) {
            Route::Direct => (url.clone(), timeout),
            Route::Render { url: proxied, timeout: render_timeout } => (proxied, render_timeout.max(timeout)),
        };

        let first_agent = self.agents.pick();
        match self.attempt(url, &target, &first_agent, timeout).await {
            Ok(body) => Ok(body),
            Err(err) if allow_retry && err.is_retryable() => {
                let retry_agent = self.agents.pick_other(&first_agent);
                tracing::warn!(url = %url, error = %err, "fetch attempt failed; retrying with a different user agent");
                self.attempt(url, &target, &retry_agent, timeout).await
            }
            Err(err) => Err(err),
        }
    }
}
