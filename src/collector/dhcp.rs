//! Active lease count per DHCP server.

use std::sync::Arc;

use crate::collector::table::{count_only, fetch_names};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};

pub struct DhcpCollector {
    leases_active: Arc<MetricDescriptor>,
}

impl DhcpCollector {
    pub fn new() -> Self {
        Self {
            leases_active: MetricDescriptor::new(
                "dhcp",
                "leases_active_count",
                "number of active leases per DHCP server",
                &["server"],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for DhcpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for DhcpCollector {
    fn name(&self) -> &'static str {
        "dhcp"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.leases_active)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let servers = fetch_names(ctx, "/ip/dhcp-server/print", &[]).await?;
        for server in &servers {
            let filter = format!("?server={server}");
            let count = count_only(
                ctx,
                "/ip/dhcp-server/lease/print",
                &[filter.as_str(), "=active="],
            )
            .await?;
            if let Some(count) = count {
                ctx.emit(&self.leases_active, count, &[server.as_str()]);
            }
        }
        Ok(())
    }
}
