//! Metric descriptors, observations and the shared observation sink.
//!
//! Collectors build their [`MetricDescriptor`]s once at construction and
//! share them read-only across scrapes. Each scrape writes [`Observation`]s
//! into an [`ObservationSink`]; the exposition layer drains the matching
//! [`ObservationStream`] after every worker has finished.

use std::sync::Arc;

use strum_macros::{AsRefStr, Display};
use tokio::sync::mpsc;

/// Prefix shared by every metric this exporter emits.
pub const NAMESPACE: &str = "mikrotik";

/// Exposition type of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Gauge,
    Counter,
}

/// Static metadata for one metric family.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDescriptor {
    fq_name: String,
    help: String,
    labels: Vec<&'static str>,
    kind: ValueKind,
}

impl MetricDescriptor {
    /// Build `mikrotik_<subsystem>_<name>`.
    pub fn new(
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        labels: &[&'static str],
        kind: ValueKind,
    ) -> Arc<Self> {
        Arc::new(Self {
            fq_name: fq_name(subsystem, name),
            help: help.into(),
            labels: labels.to_vec(),
            kind,
        })
    }

    /// Descriptor named after a device property; `-` becomes `_` and the
    /// property itself is used as help text.
    pub fn for_property(
        subsystem: &str,
        property: &str,
        labels: &[&'static str],
        kind: ValueKind,
    ) -> Arc<Self> {
        Self::new(subsystem, &metric_name(property), property, labels, kind)
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// Normalize a property name into a metric name component.
pub fn metric_name(property: &str) -> String {
    property.replace('-', "_")
}

fn fq_name(subsystem: &str, name: &str) -> String {
    [NAMESPACE, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// The device an observation was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub name: String,
    pub address: String,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// One numeric data point with resolved labels.
///
/// `labels` is ordered like `descriptor.labels()` and has the same length.
#[derive(Debug, Clone)]
pub struct Observation {
    pub descriptor: Arc<MetricDescriptor>,
    pub value: f64,
    pub labels: Vec<String>,
    pub device: Arc<DeviceIdentity>,
}

/// Clonable writer half of the observation stream.
///
/// Never blocks; concurrent scrapes each hold a clone.
#[derive(Clone)]
pub struct ObservationSink {
    tx: mpsc::UnboundedSender<Observation>,
}

impl std::fmt::Debug for ObservationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationSink").finish_non_exhaustive()
    }
}

impl ObservationSink {
    /// Push an observation. Dropped silently when the reader is gone.
    pub fn send(&self, observation: Observation) {
        if self.tx.send(observation).is_err() {
            tracing::debug!("Observation stream closed, dropping observation");
        }
    }
}

/// Reader half of the observation stream.
#[derive(Debug)]
pub struct ObservationStream {
    rx: mpsc::UnboundedReceiver<Observation>,
}

impl ObservationStream {
    /// Close the stream and collect everything written so far.
    pub fn drain(mut self) -> Vec<Observation> {
        self.rx.close();
        let mut observations = Vec::new();
        while let Ok(observation) = self.rx.try_recv() {
            observations.push(observation);
        }
        observations
    }
}

/// Create a connected sink/stream pair.
pub fn channel() -> (ObservationSink, ObservationStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ObservationSink { tx }, ObservationStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_names() {
        let desc = MetricDescriptor::for_property(
            "system",
            "free-memory",
            &["boardname", "version"],
            ValueKind::Gauge,
        );
        assert_eq!(desc.fq_name(), "mikrotik_system_free_memory");
        assert_eq!(desc.help(), "free-memory");
        assert_eq!(desc.labels(), &["boardname", "version"]);
        assert_eq!(desc.kind().as_ref(), "gauge");

        let desc = MetricDescriptor::new("", "up", "help", &[], ValueKind::Counter);
        assert_eq!(desc.fq_name(), "mikrotik_up");
    }

    #[tokio::test]
    async fn test_sink_concurrent_writers() {
        let (sink, stream) = channel();
        let desc = MetricDescriptor::new("test", "value", "help", &[], ValueKind::Gauge);
        let device = Arc::new(DeviceIdentity::new("r1", "10.0.0.1"));

        let mut handles = Vec::new();
        for i in 0..4 {
            let sink = sink.clone();
            let desc = Arc::clone(&desc);
            let device = Arc::clone(&device);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    sink.send(Observation {
                        descriptor: Arc::clone(&desc),
                        value: i as f64,
                        labels: Vec::new(),
                        device: Arc::clone(&device),
                    });
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(stream.drain().len(), 40);
    }

    #[test]
    fn test_send_after_drain_is_ignored() {
        let (sink, stream) = channel();
        assert!(stream.drain().is_empty());
        sink.send(Observation {
            descriptor: MetricDescriptor::new("test", "value", "help", &[], ValueKind::Gauge),
            value: 1.0,
            labels: Vec::new(),
            device: Arc::new(DeviceIdentity::default()),
        });
    }
}
