//! Ordered strategy registry.
//!
//! Selection is a pure function of the URL: registered strategies are
//! scanned in registration order and the first that can handle the URL
//! wins; otherwise the generic fallback is returned.

use url::Url;

use crate::extract::{BrandExtractor, BrandProfile, DefaultExtractor, ProductExtractor, StrategyId};
use prodex_core::config::AugmentConfig;

/// Brand strategies plus one generic fallback.
pub struct ExtractorRegistry {
    strategies: Vec<Box<dyn ProductExtractor>>,
    fallback: DefaultExtractor,
}

impl ExtractorRegistry {
    /// A registry with no brand strategies.
    pub fn new() -> Self {
        Self { strategies: Vec::new(), fallback: DefaultExtractor }
    }

    /// A registry with every built-in brand registered.
    pub fn with_defaults(augment: &AugmentConfig) -> Self {
        let mut registry = Self::new();
        registry.register(BrandExtractor::new(&BrandProfile::ZARA, augment.clone()));
        registry
    }

    /// Append a strategy. Earlier registrations take precedence.
    pub fn register(&mut self, strategy: impl ProductExtractor + 'static) -> &mut Self {
        tracing::debug!(strategy = %strategy.id(), position = self.strategies.len(), "registered strategy");
        self.strategies.push(Box::new(strategy));
        self
    }

    /// The strategy responsible for `url`.
    pub fn get_extractor(&self, url: &Url) -> &dyn ProductExtractor {
        self.strategies
            .iter()
            .find(|strategy| strategy.can_handle(url))
            .map(|strategy| strategy.as_ref())
            .unwrap_or(&self.fallback)
    }

    /// Identifier of the strategy responsible for `url`.
    pub fn select_strategy(&self, url: &Url) -> StrategyId {
        self.get_extractor(url).id()
    }

    /// Identifiers of registered strategies, in precedence order, followed by the fallback.
    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).chain(std::iter::once(self.fallback.id())).collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults(&AugmentConfig::default())
    }
}
