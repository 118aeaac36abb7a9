//! Reconciler configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the [`Reconciler`](super::Reconciler).
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ReconcilerConfig {
    /// Maximum number of store requests in flight at once.
    #[builder(default = "8")]
    pub max_concurrent_requests: usize,

    /// Quiet period after a graph change before a background pass runs.
    #[builder(default = "Duration::from_millis(200)")]
    pub debounce: Duration,
}

impl ReconcilerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_requests == Some(0) {
            return Err("max_concurrent_requests must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            debounce: Duration::from_millis(200),
        }
    }
}
