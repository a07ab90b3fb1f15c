//! Interface traffic and state collector.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "interface";
const LABELS: &[&str] = &["interface", "type", "disabled", "comment", "running", "slave"];
const LABEL_PROPS: [&str; 5] = ["name", "type", "disabled", "comment", "slave"];
const COUNTERS: [&str; 9] = [
    "rx-byte",
    "tx-byte",
    "rx-packet",
    "tx-packet",
    "rx-error",
    "tx-error",
    "rx-drop",
    "tx-drop",
    "link-downs",
];

pub struct InterfaceCollector {
    metrics: Vec<PropertyMetric>,
}

impl InterfaceCollector {
    pub fn new() -> Self {
        let mut metrics = vec![
            PropertyMetric::new(SUBSYSTEM, "actual-mtu", Rule::Number, ValueKind::Gauge, LABELS),
            PropertyMetric::new(SUBSYSTEM, "running", Rule::Flag, ValueKind::Gauge, LABELS),
        ];
        metrics.extend(
            COUNTERS
                .iter()
                .map(|&p| {
                    PropertyMetric::new(SUBSYSTEM, p, Rule::Number, ValueKind::Counter, LABELS)
                }),
        );
        Self { metrics }
    }
}

impl Default for InterfaceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for InterfaceCollector {
    fn name(&self) -> &'static str {
        "interface"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(
            LABEL_PROPS
                .into_iter()
                .chain(self.metrics.iter().map(|m| m.property())),
        );
        let reply = ctx.run("/interface/print", &[columns.as_str()]).await?;

        for row in &reply.re {
            let labels = [
                row.value("name"),
                row.value("type"),
                row.value("disabled"),
                row.value("comment"),
                row.value("running"),
                row.value("slave"),
            ];
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
    async fn test_interface_metrics() {
        let conn = ScriptedConnection::new().rows(
            "/interface/print",
            vec![
                record(&[
                    ("name", "ether1"),
                    ("type", "ether"),
                    ("disabled", "false"),
                    ("running", "true"),
                    ("actual-mtu", "1500"),
                    ("rx-byte", "123456"),
                    ("tx-byte", "654321"),
                    ("link-downs", "2"),
                ]),
                record(&[
                    ("name", "bridge"),
                    ("type", "bridge"),
                    ("running", "false"),
                    ("rx-byte", ""),
                ]),
            ],
        );
        let run = collect_with(&InterfaceCollector::new(), conn).await;
        assert!(run.result.is_ok());

        let ether1 = ["ether1", "ether", "false", "", "true", ""];
        assert_eq!(run.value("mikrotik_interface_actual_mtu", &ether1), Some(1500.0));
        assert_eq!(run.value("mikrotik_interface_running", &ether1), Some(1.0));
        assert_eq!(run.value("mikrotik_interface_rx_byte", &ether1), Some(123_456.0));
        assert_eq!(run.value("mikrotik_interface_link_downs", &ether1), Some(2.0));

        let bridge = ["bridge", "bridge", "", "", "false", ""];
        assert_eq!(run.value("mikrotik_interface_running", &bridge), Some(0.0));
        assert_eq!(run.value("mikrotik_interface_rx_byte", &bridge), None);
        assert_eq!(run.observations.len(), 6);
    }

    #[test]
    fn test_counter_kinds() {
        let collector = InterfaceCollector::new();
        let kinds: Vec<_> = collector
            .describe()
            .iter()
            .map(|d| (d.fq_name().to_string(), d.kind()))
            .collect();
        assert_eq!(kinds[0], ("mikrotik_interface_actual_mtu".to_string(), ValueKind::Gauge));
        assert_eq!(kinds[2], ("mikrotik_interface_rx_byte".to_string(), ValueKind::Counter));
        assert_eq!(kinds.len(), 11);
    }
}
