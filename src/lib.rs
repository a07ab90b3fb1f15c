//! Prometheus exporter for MikroTik RouterOS devices.
//!
//! The crate talks to devices over the RouterOS API, turns the records they
//! return into typed numeric observations and renders them in the Prometheus
//! text format.
//!
//! # Architecture
//!
//! - **API client** ([`api`]): word/sentence framing over TCP or TLS
//! - **Sessions** ([`session`]): dial and log in, including the legacy MD5
//!   challenge method
//! - **Collectors** ([`collector`]): one per RouterOS subsystem, selected by
//!   feature flags
//! - **Normalization** ([`normalize`]): RouterOS value strings to numbers
//! - **Orchestration** ([`scrape`]): sequential collectors per device,
//!   concurrent devices, deadlines and cancellation
//! - **Exposition** ([`exposition`], [`server`]): `/probe` and `/metrics`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mikrotik_exporter::api::NetworkDialer;
//! use mikrotik_exporter::collector::{CollectorRegistry, Feature};
//! use mikrotik_exporter::metrics::channel;
//! use mikrotik_exporter::scrape::{ScrapeJob, Scraper};
//! use mikrotik_exporter::session::{Credentials, DeviceTarget};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let registry = Arc::new(CollectorRegistry::from_features(&[Feature::Resource]));
//! let target = DeviceTarget::new("192.0.2.1", 8728, Credentials::inline("admin", "secret"));
//! let job = ScrapeJob::new(target, registry, Duration::from_secs(5));
//!
//! let (sink, stream) = channel();
//! let outcome = Scraper::new(Arc::new(NetworkDialer))
//!     .scrape(&job, &sink, &CancellationToken::new())
//!     .await;
//! println!("success={} observations={}", outcome.success(), stream.drain().len());
//! # }
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod exposition;
pub mod metrics;
pub mod normalize;
pub mod probe;
pub mod scrape;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::{Collector, CollectorError, CollectorRegistry, Feature};
pub use metrics::{DeviceIdentity, MetricDescriptor, Observation, ObservationSink};
pub use probe::{ProbeError, Prober};
pub use scrape::{ScrapeError, ScrapeJob, ScrapeOutcome, Scraper};
pub use session::{DeviceTarget, Session, SessionError};
