//! BGP peer session collector.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "bgp";
const LABELS: &[&str] = &["session", "asn"];

pub struct BgpCollector {
    metrics: Vec<PropertyMetric>,
}

impl BgpCollector {
    pub fn new() -> Self {
        let mut metrics = vec![PropertyMetric::with_descriptor(
            "state",
            Rule::Established,
            MetricDescriptor::new(
                SUBSYSTEM,
                "up",
                "BGP session is established (up = 1)",
                LABELS,
                ValueKind::Gauge,
            ),
        )];
        metrics.extend(
            [
                "prefix-count",
                "updates-sent",
                "updates-received",
                "withdrawn-sent",
                "withdrawn-received",
            ]
            .into_iter()
            .map(|p| PropertyMetric::new(SUBSYSTEM, p, Rule::Number, ValueKind::Gauge, LABELS)),
        );
        Self { metrics }
    }
}

impl Default for BgpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for BgpCollector {
    fn name(&self) -> &'static str {
        "bgp"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(
            ["name", "remote-as"]
                .into_iter()
                .chain(self.metrics.iter().map(|m| m.property())),
        );
        let reply = ctx.run("/routing/bgp/peer/print", &[columns.as_str()]).await?;

        for row in &reply.re {
            let labels = [row.value("name"), row.value("remote-as")];
            for metric in &self.metrics {
                metric.emit(ctx, row, &labels);
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
    async fn test_bgp_sessions() {
        let conn = ScriptedConnection::new().rows(
            "/routing/bgp/peer/print",
            vec![
                record(&[
                    ("name", "upstream"),
                    ("remote-as", "64500"),
                    ("state", "established"),
                    ("prefix-count", "912345"),
                    ("updates-received", "17"),
                ]),
                record(&[("name", "backup"), ("remote-as", "64501"), ("state", "active")]),
                record(&[("name", "idle"), ("remote-as", "64502")]),
            ],
        );
        let run = collect_with(&BgpCollector::new(), conn).await;
        assert!(run.result.is_ok());

        assert_eq!(run.value("mikrotik_bgp_up", &["upstream", "64500"]), Some(1.0));
        assert_eq!(run.value("mikrotik_bgp_prefix_count", &["upstream", "64500"]), Some(912_345.0));
        assert_eq!(run.value("mikrotik_bgp_updates_received", &["upstream", "64500"]), Some(17.0));
        assert_eq!(run.value("mikrotik_bgp_up", &["backup", "64501"]), Some(0.0));
        assert_eq!(run.value("mikrotik_bgp_up", &["idle", "64502"]), Some(0.0));
        assert_eq!(run.value("mikrotik_bgp_prefix_count", &["backup", "64501"]), None);
        assert_eq!(run.observations.len(), 5);
        assert_eq!(
            run.requests[0][1],
            "=.proplist=name,remote-as,state,prefix-count,updates-sent,updates-received,withdrawn-sent,withdrawn-received"
        );
    }
}
