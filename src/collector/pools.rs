//! Used addresses per IPv4 pool.

use std::sync::Arc;

use crate::collector::table::{count_only, fetch_names};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};

pub struct PoolCollector {
    used: Arc<MetricDescriptor>,
}

impl PoolCollector {
    pub fn new() -> Self {
        Self {
            used: MetricDescriptor::new(
                "ip_pool",
                "pool_used_count",
                "number of used IP/prefixes in a pool",
                &["ip_version", "pool"],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for PoolCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for PoolCollector {
    fn name(&self) -> &'static str {
        "pools"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.used)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let pools = fetch_names(ctx, "/ip/pool/print", &[]).await?;
        for pool in &pools {
            let filter = format!("?pool={pool}");
            if let Some(count) = count_only(ctx, "/ip/pool/used/print", &[filter.as_str()]).await? {
                ctx.emit(&self.used, count, &["4", pool.as_str()]);
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
    async fn test_pool_usage() {
        let conn = ScriptedConnection::new()
            .rows(
                "/ip/pool/print",
                vec![record(&[("name", "dhcp_pool0")]), record(&[("name", "vpn")])],
            )
            .count("/ip/pool/used/print", "17")
            .count("/ip/pool/used/print", "0");
        let run = collect_with(&PoolCollector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(
            run.requests[1],
            vec!["/ip/pool/used/print", "?pool=dhcp_pool0", "=count-only="]
        );
        assert_eq!(run.value("mikrotik_ip_pool_pool_used_count", &["4", "dhcp_pool0"]), Some(17.0));
        assert_eq!(run.value("mikrotik_ip_pool_pool_used_count", &["4", "vpn"]), Some(0.0));
    }
}
