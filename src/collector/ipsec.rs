//! Static IPsec policy state.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

const SUBSYSTEM: &str = "ipsec";
const LABELS: &[&str] = &["srcdst", "comment"];

pub struct IpsecCollector {
    metrics: [PropertyMetric; 3],
}

impl IpsecCollector {
    pub fn new() -> Self {
        let metric = |p: &'static str, rule: Rule| {
            PropertyMetric::new(SUBSYSTEM, p, rule, ValueKind::Gauge, LABELS)
        };
        Self {
            metrics: [
                metric("ph2-state", Rule::Established),
                metric("invalid", Rule::Flag),
                metric("active", Rule::Flag),
            ],
        }
    }
}

impl Default for IpsecCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for IpsecCollector {
    fn name(&self) -> &'static str {
        "ipsec"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.metrics.iter().map(|m| Arc::clone(m.descriptor())).collect()
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(
            ["src-address", "dst-address"]
                .into_iter()
                .chain(self.metrics.iter().map(|m| m.property()))
                .chain(["comment"]),
        );
        let reply = ctx
            .run(
                "/ip/ipsec/policy/print",
                &["?disabled=false", "?dynamic=false", columns.as_str()],
            )
            .await?;

        for row in &reply.re {
            let srcdst = format!("{}-{}", row.value("src-address"), row.value("dst-address"));
            let labels = [srcdst.as_str(), row.value("comment")];
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
    async fn test_policies() {
        let conn = ScriptedConnection::new().rows(
            "/ip/ipsec/policy/print",
            vec![record(&[
                ("src-address", "10.1.0.0/16"),
                ("dst-address", "10.2.0.0/16"),
                ("ph2-state", "established"),
                ("invalid", "false"),
                ("active", "true"),
                ("comment", "site-b"),
            ])],
        );
        let run = collect_with(&IpsecCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(
            run.requests[0],
            vec![
                "/ip/ipsec/policy/print",
                "?disabled=false",
                "?dynamic=false",
                "=.proplist=src-address,dst-address,ph2-state,invalid,active,comment",
            ]
        );
        let labels = ["10.1.0.0/16-10.2.0.0/16", "site-b"];
        assert_eq!(run.value("mikrotik_ipsec_ph2_state", &labels), Some(1.0));
        assert_eq!(run.value("mikrotik_ipsec_invalid", &labels), Some(0.0));
        assert_eq!(run.value("mikrotik_ipsec_active", &labels), Some(1.0));
    }
}
