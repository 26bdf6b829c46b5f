use hoplink_filter::FilterConfig;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Tunables for the resolution service.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServiceConfig {
    /// Cache TTL applied to records that carry no explicit expiry.
    #[builder(default = Duration::from_secs(3600))]
    pub default_cache_ttl: Duration,

    /// How many random codes to try before giving up on generation.
    ///
    /// Collisions are vanishingly rare at 64^10 codes; the bound trades
    /// that tail probability for bounded latency.
    #[builder(default = 3)]
    pub max_generation_attempts: u32,

    /// Sizing of the membership filter.
    #[builder(default)]
    pub filter: FilterConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
