//! Board health: voltage and temperatures.
//!
//! RouterOS 6 reports one row with a column per sensor; RouterOS 7 reports
//! one row per sensor with `name` and `value` columns. Both are handled.

use std::sync::Arc;

use crate::collector::table::PropertyMetric;
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind, metric_name};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "health";

pub struct HealthCollector {
    metrics: [PropertyMetric; 3],
}

impl HealthCollector {
    pub fn new() -> Self {
        let metric = |property: &'static str, help: &str| {
            PropertyMetric::with_descriptor(
                property,
                Rule::Number,
                MetricDescriptor::new(
                    SUBSYSTEM,
                    &metric_name(property),
                    help,
                    &[],
                    ValueKind::Gauge,
                ),
            )
        };
        Self {
            metrics: [
                metric("voltage", "Input voltage to the RouterOS board, in volts"),
                metric("temperature", "Temperature of RouterOS board, in degrees Celsius"),
                metric("cpu-temperature", "Temperature of RouterOS CPU, in degrees Celsius"),
            ],
        }
    }
}

impl Default for HealthCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for HealthCollector {
    fn name(&self) -> &'static str {
        "health"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let reply = ctx.run("/system/health/print", &[]).await?;

        for row in &reply.re {
            match row.get("name") {
                Some(sensor) => {
                    // Sensors other than the known three are not exported.
                    if let Some(metric) = self.metrics.iter().find(|m| m.property() == sensor) {
                        metric.emit_value(ctx, row.get("value"), &[]);
                    }
                }
                None => {
                    for metric in &self.metrics {
                        metric.emit(ctx, row, &[]);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedConnection, collect_with, record};

    #[tokio::test]
    async fn test_legacy_columns() {
        let conn = ScriptedConnection::new().rows(
            "/system/health/print",
            vec![record(&[("voltage", "24.1"), ("temperature", "41"), ("cpu-temperature", "")])],
        );
        let run = collect_with(&HealthCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(run.value("mikrotik_health_voltage", &[]), Some(24.1));
        assert_eq!(run.value("mikrotik_health_temperature", &[]), Some(41.0));
        assert_eq!(run.observations.len(), 2);
    }

    #[tokio::test]
    async fn test_named_rows() {
        let conn = ScriptedConnection::new().rows(
            "/system/health/print",
            vec![
                record(&[("name", "cpu-temperature"), ("value", "52"), ("type", "C")]),
                record(&[("name", "fan1-speed"), ("value", "3200")]),
                record(&[("name", "voltage"), ("value", "bad")]),
            ],
        );
        let run = collect_with(&HealthCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(run.samples(), vec![(
            "mikrotik_health_cpu_temperature".to_string(),
            Vec::new(),
            52.0
        )]);
    }
}
