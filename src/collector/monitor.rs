//! Ethernet link state, negotiated rate and duplex.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, fetch_names, monitor_once};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "monitor";
const LABELS: &[&str] = &["interface"];

pub struct MonitorCollector {
    metrics: [PropertyMetric; 3],
}

impl MonitorCollector {
    pub fn new() -> Self {
        let metric = |p: &'static str, rule: Rule| {
            PropertyMetric::new(SUBSYSTEM, p, rule, ValueKind::Gauge, LABELS)
        };
        Self {
            metrics: [
                metric("status", Rule::LinkOk),
                metric("rate", Rule::Rate),
                metric("full-duplex", Rule::Flag),
            ],
        }
    }
}

impl Default for MonitorCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for MonitorCollector {
    fn name(&self) -> &'static str {
        "monitor"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let ports = fetch_names(ctx, "/interface/ethernet/print", &[]).await?;
        if ports.is_empty() {
            return Ok(());
        }

        let props: Vec<&str> = self.metrics.iter().map(|m| m.property()).collect();
        let rows = monitor_once(ctx, "/interface/ethernet/monitor", &ports, &props).await?;
        for row in &rows {
            let labels = [row.value("name")];
            for metric in &self.metrics {
                metric.emit(ctx, row, &labels);
            }
        }
        Ok(())
    }
}
