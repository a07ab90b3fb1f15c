//! LTE modem signal quality.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, fetch_names, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "lte_interface";
const LABELS: &[&str] = &["interface", "cellid", "primaryband", "caband"];

pub struct LteCollector {
    metrics: [PropertyMetric; 4],
}

impl LteCollector {
    pub fn new() -> Self {
        let metric = |p: &'static str| {
            PropertyMetric::new(SUBSYSTEM, p, Rule::Number, ValueKind::Gauge, LABELS)
        };
        Self {
            metrics: [metric("rssi"), metric("rsrp"), metric("rsrq"), metric("sinr")],
        }
    }
}

impl Default for LteCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only the band and its width, e.g. `B3@20Mhz earfcn: 1300` → `B3@20Mhz`.
fn band(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or_default()
}

#[async_trait::async_trait]
impl Collector for LteCollector {
    fn name(&self) -> &'static str {
        "lte"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let modems = fetch_names(ctx, "/interface/lte/print", &["?disabled=false"]).await?;
        let columns = proplist(
            ["current-cellid", "primary-band", "ca-band"]
                .into_iter()
                .chain(self.metrics.iter().map(|m| m.property())),
        );

        for modem in &modems {
            let number = format!("=number={modem}");
            let reply = ctx
                .run(
                    "/interface/lte/info",
                    &[number.as_str(), "=once=", columns.as_str()],
                )
                .await?;

            // The reply holds a single row for the requested interface.
            let Some(row) = reply.re.first() else {
                tracing::debug!(
                    device = %ctx.device().name,
                    interface = %modem,
                    "LTE info returned no data"
                );
                continue;
            };
            let labels = [
                modem.as_str(),
                row.value("current-cellid"),
                band(row.value("primary-band")),
                band(row.value("ca-band")),
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
    use crate::api::Reply;
    use crate::testing::{ScriptedConnection, collect_with, record};

    #[test]
    fn test_band() {
        assert_eq!(band("B3@20Mhz earfcn: 1300 phy-cellid: 12"), "B3@20Mhz");
        assert_eq!(band(""), "");
    }

    #[tokio::test]
    async fn test_lte_info() {
        let conn = ScriptedConnection::new()
            .rows(
                "/interface/lte/print",
                vec![record(&[("name", "lte1")]), record(&[("name", "lte2")])],
            )
            .rows(
                "/interface/lte/info",
                vec![record(&[
                    ("current-cellid", "2212"),
                    ("primary-band", "B3@20Mhz earfcn: 1300 phy-cellid: 12"),
                    ("ca-band", ""),
                    ("rssi", "-67"),
                    ("rsrp", "-95"),
                    ("rsrq", "-10"),
                    ("sinr", "12"),
                ])],
            )
            .reply("/interface/lte/info", Reply::completed());
        let run = collect_with(&LteCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(
            run.requests[0],
            vec!["/interface/lte/print", "?disabled=false", "=.proplist=name"]
        );
        assert_eq!(run.requests[1][1], "=number=lte1");
        let labels = ["lte1", "2212", "B3@20Mhz", ""];
        assert_eq!(run.value("mikrotik_lte_interface_rssi", &labels), Some(-67.0));
        assert_eq!(run.value("mikrotik_lte_interface_sinr", &labels), Some(12.0));
        assert_eq!(run.observations.len(), 4);
    }
}
