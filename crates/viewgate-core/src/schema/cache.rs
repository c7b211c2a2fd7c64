use std::time::Duration;

/// Read-cache configuration for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache-key namespace; derived keys are prefixed with this.
    pub namespace: String,

    /// Time-to-live for cached result sets.
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            ttl,
        }
    }
}
