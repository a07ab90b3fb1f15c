//! Per-scrape bundle handed to every collector.

use std::sync::Arc;

use crate::api::Reply;
use crate::collector::CollectorError;
use crate::metrics::{DeviceIdentity, MetricDescriptor, Observation, ObservationSink};
use crate::session::Session;

/// Session, output sink and device identity for one device scrape.
///
/// Owned by a single scrape worker; collectors borrow it one at a time so
/// queries on the session never overlap.
pub struct ScrapeContext<'a> {
    session: &'a mut Session,
    sink: &'a ObservationSink,
    device: Arc<DeviceIdentity>,
}

impl std::fmt::Debug for ScrapeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeContext")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl<'a> ScrapeContext<'a> {
    pub fn new(
        session: &'a mut Session,
        sink: &'a ObservationSink,
        device: Arc<DeviceIdentity>,
    ) -> Self {
        Self {
            session,
            sink,
            device,
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Run one query, tagging failures with the command.
    pub async fn run(&mut self, command: &str, args: &[&str]) -> Result<Reply, CollectorError> {
        self.session
            .run(command, args)
            .await
            .map_err(|source| CollectorError::Query {
                command: command.to_string(),
                source,
            })
    }

    /// Emit one observation.
    ///
    /// Observations whose label count differs from the descriptor's arity
    /// are rejected and logged.
    pub fn emit(&self, descriptor: &Arc<MetricDescriptor>, value: f64, labels: &[&str]) {
        if labels.len() != descriptor.labels().len() {
            tracing::error!(
                metric = descriptor.fq_name(),
                expected = descriptor.labels().len(),
                got = labels.len(),
                "Label count does not match descriptor"
            );
            return;
        }
        self.sink.send(Observation {
            descriptor: Arc::clone(descriptor),
            value,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            device: Arc::clone(&self.device),
        });
    }
}
