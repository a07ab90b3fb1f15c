//! PoE output per ethernet port.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, fetch_names, monitor_once};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "poe";
const LABELS: &[&str] = &["interface"];

pub struct PoeCollector {
    metrics: [PropertyMetric; 3],
}

impl PoeCollector {
    pub fn new() -> Self {
        let metric = |property: &'static str, name: &str, help: &str| {
            PropertyMetric::with_descriptor(
                property,
                Rule::Number,
                MetricDescriptor::new(SUBSYSTEM, name, help, LABELS, ValueKind::Gauge),
            )
        };
        Self {
            metrics: [
                metric("poe-out-current", "current", "current in mA"),
                metric("poe-out-voltage", "voltage", "Voltage in V"),
                metric("poe-out-power", "wattage", "Power in W"),
            ],
        }
    }
}

impl Default for PoeCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for PoeCollector {
    fn name(&self) -> &'static str {
        "poe"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let ports = fetch_names(ctx, "/interface/ethernet/poe/print", &[]).await?;
        if ports.is_empty() {
            return Ok(());
        }

        let props: Vec<&str> = self.metrics.iter().map(|m| m.property()).collect();
        let rows = monitor_once(ctx, "/interface/ethernet/poe/monitor", &ports, &props).await?;
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
