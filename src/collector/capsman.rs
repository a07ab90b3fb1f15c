//! CAPsMAN registration table.

use std::sync::Arc;

use crate::collector::table::{PairMetric, PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "capsman_station";
const LABELS: &[&str] = &["interface", "mac_address", "ssid"];

pub struct CapsmanCollector {
    metrics: [PropertyMetric; 3],
    counters: [PairMetric; 2],
}

impl CapsmanCollector {
    pub fn new() -> Self {
        let gauge = |p: &'static str, rule: Rule| {
            PropertyMetric::new(SUBSYSTEM, p, rule, ValueKind::Gauge, LABELS)
        };
        Self {
            metrics: [
                gauge("uptime", Rule::Duration),
                gauge("tx-signal", Rule::QualifiedNumber),
                gauge("rx-signal", Rule::QualifiedNumber),
            ],
            counters: [
                PairMetric::new(SUBSYSTEM, "packets", LABELS),
                PairMetric::new(SUBSYSTEM, "bytes", LABELS),
            ],
        }
    }
}

impl Default for CapsmanCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for CapsmanCollector {
    fn name(&self) -> &'static str {
        "capsman"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics
            .iter()
            .map(|m| Arc::clone(m.descriptor()))
            .chain(self.counters.iter().flat_map(|c| c.descriptors()))
            .collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist([
            "interface",
            "mac-address",
            "ssid",
            "uptime",
            "tx-signal",
            "rx-signal",
            "packets",
            "bytes",
        ]);
        let reply = ctx
            .run("/caps-man/registration-table/print", &[columns.as_str()])
            .await?;

        for row in &reply.re {
            let labels = [row.value("interface"), row.value("mac-address"), row.value("ssid")];
            for metric in &self.metrics {
                metric.emit(ctx, row, &labels);
            }
            for counter in &self.counters {
                counter.emit(ctx, row, &labels);
            }
        }
        Ok(())
    }
}
