//! Netwatch host reachability.

use std::sync::Arc;

use crate::collector::table::{PropertyMetric, proplist};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::Rule;

pub struct NetwatchCollector {
    status: PropertyMetric,
}

impl NetwatchCollector {
    pub fn new() -> Self {
        Self {
            status: PropertyMetric::new(
                "netwatch",
                "status",
                Rule::UpDown,
                ValueKind::Gauge,
                &["host", "comment"],
            ),
        }
    }
}

impl Default for NetwatchCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for NetwatchCollector {
    fn name(&self) -> &'static str {
        "netwatch"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(self.status.descriptor())]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let columns = proplist(["host", "comment", "status"]);
        let reply = ctx
            .run("/tool/netwatch/print", &["?disabled=false", columns.as_str()])
            .await?;

        for row in &reply.re {
            self.status
                .emit(ctx, row, &[row.value("host"), row.value("comment")]);
        }
        Ok(())
    }
}
