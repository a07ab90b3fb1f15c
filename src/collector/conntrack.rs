//! Connection tracking table usage.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "conntrack";

pub struct ConntrackCollector {
    metrics: [PropertyMetric; 2],
}

impl ConntrackCollector {
    pub fn new() -> Self {
        let metric = |property: &'static str, name: &str, help: &str| {
            PropertyMetric::with_descriptor(
                property,
                Rule::Number,
                MetricDescriptor::new(SUBSYSTEM, name, help, &[], ValueKind::Gauge),
            )
        };
        Self {
            metrics: [
                metric("total-entries", "entries", "Number of tracked connections"),
                metric("max-entries", "max_entries", "Conntrack table capacity"),
            ],
        }
    }
}

impl Default for ConntrackCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for ConntrackCollector {
    fn name(&self) -> &'static str {
        "conntrack"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(self.metrics.iter().map(|m| m.property()));
        let reply = ctx
            .run("/ip/firewall/connection/tracking/print", &[columns.as_str()])
            .await?;

        for row in &reply.re {
            for metric in &self.metrics {
                metric.emit(ctx, row, &[]);
            }
        }
        Ok(())
    }
}
