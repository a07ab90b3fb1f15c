//! Prometheus text exposition.
//!
//! Observations are grouped into metric families by descriptor, in the
//! order their descriptors were first seen, and encoded together with the
//! process metrics held by an explicitly constructed [`ExporterRegistry`].

use std::collections::HashMap;

use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::metrics::{NAMESPACE, Observation, ValueKind};

/// Label names prepended to every sample in multi-device output.
pub const DEVICE_LABELS: [&str; 2] = ["name", "address"];

/// Errors from building or encoding the exposition output.
#[derive(Debug, Error)]
pub enum ExpositionError {
    /// Failed to register a collector with the registry.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    /// Failed to encode metrics output.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Process-level metrics, built once at startup and passed to the HTTP layer.
#[derive(Clone)]
pub struct ExporterRegistry {
    registry: Registry,
}

impl std::fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterRegistry").finish_non_exhaustive()
    }
}

impl ExporterRegistry {
    /// Create a registry with process metrics and build information.
    pub fn new() -> Result<Self, ExpositionError> {
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        let build_info = Gauge::with_opts(
            Opts::new(
                format!("{NAMESPACE}_exporter_build_info"),
                "Build information of the exporter",
            )
            .const_label("version", env!("CARGO_PKG_VERSION")),
        )?;
        build_info.set(1.0);
        registry.register(Box::new(build_info))?;

        Ok(Self { registry })
    }

    /// Encode `observations` followed by the registry's own families.
    pub fn encode(
        &self,
        observations: &[Observation],
        device_labels: bool,
    ) -> Result<String, ExpositionError> {
        let mut families = families(observations, device_labels);
        families.extend(self.registry.gather());
        encode_text(&families)
    }
}

/// Group observations into metric families.
///
/// With `device_labels` set, `name` and `address` of the originating device
/// are prepended to every sample's labels.
pub fn families(observations: &[Observation], device_labels: bool) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for observation in observations {
        let descriptor = &observation.descriptor;
        let position = *index.entry(descriptor.fq_name()).or_insert_with(|| {
            let mut family = MetricFamily::default();
            family.set_name(descriptor.fq_name().to_string());
            family.set_help(descriptor.help().to_string());
            family.set_field_type(match descriptor.kind() {
                ValueKind::Gauge => MetricType::GAUGE,
                ValueKind::Counter => MetricType::COUNTER,
            });
            families.push(family);
            families.len() - 1
        });

        let mut metric = proto::Metric::default();
        if device_labels {
            let device = &observation.device;
            push_label(&mut metric, DEVICE_LABELS[0], &device.name);
            push_label(&mut metric, DEVICE_LABELS[1], &device.address);
        }
        for (name, value) in descriptor.labels().iter().zip(&observation.labels) {
            push_label(&mut metric, name, value);
        }

        match descriptor.kind() {
            ValueKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(observation.value);
                metric.set_gauge(gauge);
            }
            ValueKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(observation.value);
                metric.set_counter(counter);
            }
        }

        families[position].mut_metric().push(metric);
    }

    families
}

fn push_label(metric: &mut proto::Metric, name: &str, value: &str) {
    let mut pair = proto::LabelPair::default();
    pair.set_name(name.to_string());
    pair.set_value(value.to_string());
    metric.mut_label().push(pair);
}

/// Encode metric families in the Prometheus text format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, ExpositionError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(families, &mut buffer)
        .map_err(|e| ExpositionError::Encoding(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ExpositionError::Encoding(e.to_string()))
}
