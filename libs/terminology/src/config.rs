//! Engine configuration

use std::num::NonZeroUsize;
use std::time::Duration;

/// Resolver configuration, constructed by the embedder and passed in
/// explicitly. There is no global state: two resolvers with different
/// configurations can coexist in one process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// BCP 47 language the resolver translates displays into.
    pub target_language: String,
    /// Optional country refinement for region-specific translations.
    pub target_country: Option<String>,
    /// TTL for successfully resolved terms.
    pub cache_ttl_positive: Duration,
    /// TTL for fallback results. Kept short so catalogue updates surface
    /// without a cache flush.
    pub cache_ttl_negative: Duration,
    /// Maximum number of cached terms.
    pub cache_capacity: NonZeroUsize,
    /// Upper bound on a single store lookup; expiry degrades the call to the
    /// fallback path instead of stalling the pipeline.
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            target_country: None,
            cache_ttl_positive: Duration::from_secs(3600),
            cache_ttl_negative: Duration::from_secs(60),
            cache_capacity: NonZeroUsize::new(4096).expect("non-zero capacity"),
            store_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Convenience constructor for the common case of overriding only the
    /// target locale.
    pub fn for_locale(language: impl Into<String>, country: Option<String>) -> Self {
        Self {
            target_language: language.into(),
            target_country: country,
            ..Self::default()
        }
    }
}
