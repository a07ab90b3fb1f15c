//! Core collector trait and error type.

use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;
use crate::collector::ScrapeContext;
use crate::metrics::MetricDescriptor;

/// Terminal failure of a collector.
///
/// Either variant aborts the remaining collectors of the current device
/// scrape. Single-property parse failures never surface here.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A device query round-trip failed.
    #[error("{command}: {source}")]
    Query {
        command: String,
        #[source]
        source: ApiError,
    },

    /// A `count-only` query answered with something other than a number.
    #[error("{command}: invalid count '{value}'")]
    InvalidCount { command: String, value: String },
}

/// One category of device state translated into metrics.
///
/// Collectors own their descriptors, built once at construction, and are
/// otherwise stateless. A single instance is shared by every concurrent
/// scrape of a module.
///
/// # Error Handling
///
/// - A failed query is returned as `Err` and ends the scrape for the device.
/// - A value that fails normalization is logged and only that observation
///   is skipped; `collect()` still returns `Ok(())`.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Feature flag name, e.g. `"interface"`.
    fn name(&self) -> &'static str;

    /// Every descriptor this collector may emit, available before any scrape.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Query the device and emit observations into the context.
    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError>;
}
