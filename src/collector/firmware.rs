//! Installed system packages.

use std::sync::Arc;

use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};

pub struct FirmwareCollector {
    package: Arc<MetricDescriptor>,
}

impl FirmwareCollector {
    pub fn new() -> Self {
        Self {
            package: MetricDescriptor::new(
                "system",
                "package",
                "system packages version",
                &["package", "disabled", "version", "build_time"],
                ValueKind::Gauge,
            ),
        }
    }
}

impl Default for FirmwareCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collector for FirmwareCollector {
    fn name(&self) -> &'static str {
        "firmware"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.package)]
    }

    async fn collect(&self, ctx: &mut ScrapeContext<'_>) -> Result<(), CollectorError> {
        let reply = ctx.run("/system/package/getall", &[]).await?;

        for pkg in &reply.re {
            let disabled = pkg.value("disabled");
            let value = if disabled.eq_ignore_ascii_case("true") { 0.0 } else { 1.0 };
            ctx.emit(
                &self.package,
                value,
                &[pkg.value("name"), disabled, pkg.value("version"), pkg.value("build-time")],
            );
        }
        Ok(())
    }
}
