//! Request routing through the external JavaScript-rendering proxy.

use std::time::Duration;

use url::Url;

use prodex_core::config::RenderConfig;

/// Where a fetch attempt is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Straight to the target.
    Direct,
    /// Through the render proxy at this URL, with its own timeout.
    Render { url: Url, timeout: Duration },
}

/// Whether `url`'s host is `suffix` or a subdomain of it.
pub fn host_matches(url: &Url, suffix: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
    host == suffix || host.strip_suffix(&suffix).is_some_and(|rest| rest.ends_with('.'))
}

/// Decide how to reach `target`.
///
/// Domains listed for rendering go through the proxy when it is enabled and
/// has a token; otherwise they fall back to a direct fetch with a warning.
pub fn plan(config: &RenderConfig, target: &Url) -> Route {
    if !config.domains.iter().any(|d| host_matches(target, d)) {
        return Route::Direct;
    }

    let token = match (&config.api_token, config.enabled) {
        (Some(token), true) => token,
        _ => {
            tracing::warn!(url = %target, "rendering proxy not configured for JS-heavy domain; fetching directly");
            return Route::Direct;
        }
    };

    match Url::parse(&config.base_url) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("url", target.as_str());
                query.append_pair("token", token);
                for (key, value) in &config.params {
                    query.append_pair(key, value);
                }
            }
            Route::Render { url, timeout: Duration::from_millis(config.timeout_ms) }
        }
        Err(e) => {
            tracing::warn!(base_url = %config.base_url, error = %e, "invalid rendering proxy URL; fetching directly");
            Route::Direct
        }
    }
}
