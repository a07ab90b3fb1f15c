//! Route counts per IP version and routing protocol.

use std::sync::Arc;

use crate::collector::table::count_only;
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};

const PROTOCOLS: [&str; 6] = ["bgp", "static", "ospf", "dynamic", "connect", "rip"];

/// `(ip_version label, menu)` pairs queried in order.
const FAMILIES: [(&str, &str); 2] = [("4", "/ip/route/print"), ("6", "/ipv6/route/print")];

pub struct RoutesCollector {
    total: Arc<MetricDescriptor>,
    per_protocol: Arc<MetricDescriptor>,
}

impl RoutesCollector {
    pub fn new() -> Self {
        Self {
            total: MetricDescriptor::new(
                "routes",
                "total_count",
                "number of routes in RIB",
                &["ip_version"],
                ValueKind::Gauge,
            ),
            per_protocol: MetricDescriptor::new(
                "routes",
                "protocol_count",
                "number of routes per protocol in RIB",
                &["ip_version", "protocol"],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for RoutesCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for RoutesCollector {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.total), Arc::clone(&self.per_protocol)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        for (version, command) in FAMILIES {
            if let Some(count) = count_only(ctx, command, &["?disabled=false"]).await? {
                ctx.emit(&self.total, count, &[version]);
            }

            for protocol in PROTOCOLS {
                let filter = format!("?{protocol}");
                if let Some(count) =
                    count_only(ctx, command, &["?disabled=false", filter.as_str()]).await?
                {
                    ctx.emit(&self.per_protocol, count, &[version, protocol]);
                }
            }
        }
        Ok(())
    }
}
