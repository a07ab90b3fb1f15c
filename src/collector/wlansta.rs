//! Wireless station registration table.

use std::sync::Arc;

use crate::collector::table::{PairMetric, PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "wlan_station";
const LABELS: &[&str] = &["interface", "mac_address"];

pub struct WlanStationCollector {
    signals: [PropertyMetric; 2],
    counters: [PairMetric; 3],
}

impl WlanStationCollector {
    pub fn new() -> Self {
        let signal = |p: &'static str| {
            PropertyMetric::new(SUBSYSTEM, p, Rule::QualifiedNumber, ValueKind::Gauge, LABELS)
        };
        let pair = |p: &'static str| PairMetric::new(SUBSYSTEM, p, LABELS);
        Self {
            signals: [signal("signal-to-noise"), signal("signal-strength")],
            counters: [pair("packets"), pair("bytes"), pair("frames")],
        }
    }
}

impl Default for WlanStationCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for WlanStationCollector {
    fn name(&self) -> &'static str {
        "wlansta"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.signals
            .iter()
            .map(|m| Arc::clone(m.descriptor()))
            .chain(self.counters.iter().flat_map(|c| c.descriptors()))
            .collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist([
            "interface",
            "mac-address",
            "signal-to-noise",
            "signal-strength",
            "packets",
            "bytes",
            "frames",
        ]);
        let reply = ctx
            .run("/interface/wireless/registration-table/print", &[columns.as_str()])
            .await?;

        for row in &reply.re {
            let labels = [row.value("interface"), row.value("mac-address")];
            for metric in &self.signals {
                metric.emit(ctx, row, &labels);
            }
            for counter in &self.counters {
                counter.emit(ctx, row, &labels);
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
    async fn test_station_metrics() {
        let conn = ScriptedConnection::new().rows(
            "/interface/wireless/registration-table/print",
            vec![record(&[
                ("interface", "wlan1"),
                ("mac-address", "AA:BB:CC:00:11:22"),
                ("signal-to-noise", "41"),
                ("signal-strength", "-63@HT20-7"),
                ("packets", "1200,3400"),
                ("bytes", "1.2,2.1,3.2"),
                ("frames", ""),
            ])],
        );
        let run = collect_with(&WlanStationCollector::new(), conn).await;

        assert!(run.result.is_ok());
        let labels = ["wlan1", "AA:BB:CC:00:11:22"];
        assert_eq!(run.value("mikrotik_wlan_station_signal_to_noise", &labels), Some(41.0));
        assert_eq!(run.value("mikrotik_wlan_station_signal_strength", &labels), Some(-63.0));
        assert_eq!(run.value("mikrotik_wlan_station_tx_packets", &labels), Some(1200.0));
        assert_eq!(run.value("mikrotik_wlan_station_rx_packets", &labels), Some(3400.0));
        assert_eq!(run.value("mikrotik_wlan_station_tx_bytes", &labels), Some(1.2));
        assert_eq!(run.value("mikrotik_wlan_station_rx_bytes", &labels), Some(2.1));
        assert_eq!(run.value("mikrotik_wlan_station_tx_frames", &labels), None);
        assert_eq!(run.observations.len(), 6);
    }

    #[test]
    fn test_describe() {
        let names: Vec<String> = WlanStationCollector::new()
            .describe()
            .iter()
            .map(|d| d.fq_name().to_string())
            .collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"mikrotik_wlan_station_rx_frames".to_string()));
    }
}
