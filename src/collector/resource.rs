//! System resource collector: memory, CPU, storage and uptime.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "system";
const LABELS: &[&str] = &["boardname", "version"];

pub struct ResourceCollector {
    metrics: Vec<PropertyMetric>,
}

impl ResourceCollector {
    pub fn new() -> Self {
        let gauge = |p: &'static str| {
            PropertyMetric::new(SUBSYSTEM, p, Rule::Number, ValueKind::Gauge, LABELS)
        };
        Self {
            metrics: vec![
                gauge("free-memory"),
                gauge("total-memory"),
                gauge("cpu-load"),
                gauge("free-hdd-space"),
                gauge("total-hdd-space"),
                PropertyMetric::new(
                    SUBSYSTEM,
                    "uptime",
                    Rule::Duration,
                    ValueKind::Counter,
                    LABELS,
                ),
            ],
        }
    }
}

impl Default for ResourceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for ResourceCollector {
    fn name(&self) -> &'static str {
        "resource"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(
            self.metrics
                .iter()
                .map(|m| m.property())
                .chain(["board-name", "version"]),
        );
        let reply = ctx.run("/system/resource/print", &[columns.as_str()]).await?;

        for row in &reply.re {
            let labels = [row.value("board-name"), row.value("version")];
            for metric in &self.metrics {
                metric.emit(ctx, row, &labels);
            }
        }
        Ok(())
    }
}
