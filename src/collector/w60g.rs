//! 60 GHz wireless link statistics.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, fetch_names, monitor_once};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "w60ginterface";
const LABELS: &[&str] = &["interface"];

pub struct W60gCollector {
    metrics: [PropertyMetric; 8],
}

impl W60gCollector {
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
                metric("signal", "signal", "Signal quality in %"),
                metric("rssi", "rssi", "Signal RSSI in dB"),
                metric("tx-mcs", "txMCS", "TX MCS"),
                metric("frequency", "frequency", "frequency of tx in MHz"),
                metric("tx-phy-rate", "txPHYRate", "PHY Rate in bps"),
                metric("tx-sector", "txSector", "TX Sector"),
                metric("distance", "txDistance", "Distance to remote"),
                metric("tx-packet-error-rate", "txPacketErrorRate", "TX Packet Error Rate"),
            ],
        }
    }
}

impl Default for W60gCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for W60gCollector {
    fn name(&self) -> &'static str {
        "w60g"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let links = fetch_names(ctx, "/interface/w60g/print", &[]).await?;
        if links.is_empty() {
            return Ok(());
        }

        let props: Vec<&str> = self.metrics.iter().map(|m| m.property()).collect();
        let rows = monitor_once(ctx, "/interface/w60g/monitor", &links, &props).await?;
        for row in &rows {
            let Some(link) = row.get("name") else {
                continue;
            };
            for metric in &self.metrics {
                metric.emit(ctx, row, &[link]);
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
    async fn test_w60g_monitor() {
        let conn = ScriptedConnection::new()
            .rows("/interface/w60g/print", vec![record(&[("name", "wlan60-1")])])
            .rows(
                "/interface/w60g/monitor",
                vec![record(&[
                    ("name", "wlan60-1"),
                    ("signal", "80"),
                    ("rssi", "-55"),
                    ("tx-mcs", "8"),
                    ("frequency", "60480"),
                    ("tx-phy-rate", "2310000000"),
                    ("tx-sector", "28"),
                    ("distance", "120"),
                    ("tx-packet-error-rate", "1"),
                ])],
            );
        let run = collect_with(&W60gCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(run.observations.len(), 8);
        assert_eq!(run.value("mikrotik_w60ginterface_txMCS", &["wlan60-1"]), Some(8.0));
        assert_eq!(run.value("mikrotik_w60ginterface_txDistance", &["wlan60-1"]), Some(120.0));
        assert_eq!(run.value("mikrotik_w60ginterface_rssi", &["wlan60-1"]), Some(-55.0));
    }
}
