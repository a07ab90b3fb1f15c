//! SFP optical module diagnostics.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, fetch_names, monitor_once};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "optics";
const LABELS: &[&str] = &["interface"];

pub struct OpticsCollector {
    metrics: [PropertyMetric; 7],
}

impl OpticsCollector {
    pub fn new() -> Self {
        let metric = |property: &'static str, rule: Rule, name: &str, help: &str| {
            PropertyMetric::with_descriptor(
                property,
                rule,
                MetricDescriptor::new(SUBSYSTEM, name, help, LABELS, ValueKind::Gauge),
            )
        };
        Self {
            metrics: [
                metric("sfp-rx-loss", Rule::InverseFlag, "rx_status", "RX status (1 = no loss)"),
                metric("sfp-tx-fault", Rule::InverseFlag, "tx_status", "TX status (1 = no faults)"),
                metric(
                    "sfp-temperature",
                    Rule::Number,
                    "temperature_celsius",
                    "temperature in degree celsius",
                ),
                metric("sfp-supply-voltage", Rule::Number, "voltage_volt", "voltage in volt"),
                metric("sfp-tx-bias-current", Rule::Number, "tx_bias_ma", "bias in milliamps"),
                metric("sfp-tx-power", Rule::Number, "tx_power_dbm", "TX power in dBm"),
                metric("sfp-rx-power", Rule::Number, "rx_power_dbm", "RX power in dBm"),
            ],
        }
    }
}

impl Default for OpticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for OpticsCollector {
    fn name(&self) -> &'static str {
        "optics"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let ports: Vec<String> = fetch_names(ctx, "/interface/ethernet/print", &[])
            .await?
            .into_iter()
            .filter(|name| name.starts_with("sfp"))
            .collect();
        if ports.is_empty() {
            return Ok(());
        }

        let props: Vec<&str> = self.metrics.iter().map(|m| m.property()).collect();
        let rows = monitor_once(ctx, "/interface/ethernet/monitor", &ports, &props).await?;
        for row in &rows {
            let Some(port) = row.get("name") else {
                continue;
            };
            for metric in &self.metrics {
                metric.emit(ctx, row, &[port]);
            }
        }
        Ok(())
    }
}
