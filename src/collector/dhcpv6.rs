//! Binding count per DHCPv6 server.

use std::sync::Arc;

use crate::collector::table::{count_only, fetch_names};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};

pub struct Dhcpv6Collector {
    binding_count: Arc<MetricDescriptor>,
}

impl Dhcpv6Collector {
    pub fn new() -> Self {
        Self {
            binding_count: MetricDescriptor::new(
                "dhcpv6",
                "binding_count",
                "number of active bindings per DHCPv6 server",
                &["server"],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for Dhcpv6Collector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for Dhcpv6Collector {
    fn name(&self) -> &'static str {
        "dhcpv6"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.binding_count)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let servers = fetch_names(ctx, "/ipv6/dhcp-server/print", &[]).await?;
        for server in &servers {
            let filter = format!("?server={server}");
            if let Some(count) =
                count_only(ctx, "/ipv6/dhcp-server/binding/print", &[filter.as_str()]).await?
            {
                ctx.emit(&self.binding_count, count, &[server.as_str()]);
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
    async fn test_binding_counts() {
        let conn = ScriptedConnection::new()
            .rows("/ipv6/dhcp-server/print", vec![record(&[("name", "pd")])])
            .count("/ipv6/dhcp-server/binding/print", "3");
        let run = collect_with(&Dhcpv6Collector::new(), conn).await;

        assert!(run.result.is_ok());
        assert_eq!(run.value("mikrotik_dhcpv6_binding_count", &["pd"]), Some(3.0));
    }

    #[tokio::test]
    async fn test_non_numeric_count_fails() {
        let conn = ScriptedConnection::new()
            .rows("/ipv6/dhcp-server/print", vec![record(&[("name", "pd")])])
            .count("/ipv6/dhcp-server/binding/print", "n/a");
        let run = collect_with(&Dhcpv6Collector::new(), conn).await;

        assert!(matches!(run.result, Err(CollectorError::InvalidCount { .. })));
    }
}
