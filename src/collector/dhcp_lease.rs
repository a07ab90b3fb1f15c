//! Bound DHCP leases, one series per lease.

use std::sync::Arc;

use crate::collector::table::proplist;
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::parse_duration;

const PROPS: [&str; 6] = [
    "active-mac-address",
    "server",
    "status",
    "expires-after",
    "active-address",
    "host-name",
];

pub struct DhcpLeaseCollector {
    lease: Arc<MetricDescriptor>,
}

impl DhcpLeaseCollector {
    pub fn new() -> Self {
        Self {
            lease: MetricDescriptor::new(
                "dhcp",
                "leases_metrics",
                "number of metrics",
                &[
                    "activemacaddress",
                    "server",
                    "status",
                    "expiresafter",
                    "activeaddress",
                    "hostname",
                ],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for DhcpLeaseCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote and escape a client-supplied host name; some clients send
/// arbitrary bytes.
fn quote_host_name(host: &str) -> String {
    format!("\"{}\"", host.escape_default())
}

#[async_trait::async_trait]
impl Collector for DhcpLeaseCollector {
    fn name(&self) -> &'static str {
        "dhcpl"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.lease)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(PROPS);
        let reply = ctx
            .run("/ip/dhcp-server/lease/print", &["?status=bound", columns.as_str()])
            .await?;

        for row in &reply.re {
            let raw_expiry = row.value("expires-after");
            let expires_after = match parse_duration(raw_expiry) {
                Ok(seconds) => format!("{seconds:.0}"),
                Err(e) => {
                    tracing::error!(
                        device = %ctx.device().name,
                        property = "expires-after",
                        value = raw_expiry,
                        error = %e,
                        "Failed to parse lease expiry"
                    );
                    continue;
                }
            };
            let host_name = quote_host_name(row.value("host-name"));
            ctx.emit(
                &self.lease,
                1.0,
                &[
                    row.value("active-mac-address"),
                    row.value("server"),
                    row.value("status"),
                    expires_after.as_str(),
                    row.value("active-address"),
                    host_name.as_str(),
                ],
            );
        }
        Ok(())
    }
}
