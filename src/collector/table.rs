//! Shared building blocks for table-driven collectors.

use std::sync::Arc;

use crate::api::Record;
use crate::collector::{CollectorError, ScrapeContext};
use crate::metrics::{MetricDescriptor, ValueKind};
use crate::normalize::{Rule, split_pair};

/// A device property mapped to one metric through a normalization rule.
#[derive(Debug)]
pub struct PropertyMetric {
    property: &'static str,
    rule: Rule,
    descriptor: Arc<MetricDescriptor>,
}

impl PropertyMetric {
    /// Metric named after the property itself.
    pub fn new(
        subsystem: &str,
        property: &'static str,
        rule: Rule,
        kind: ValueKind,
        labels: &[&'static str],
    ) -> Self {
        Self {
            property,
            rule,
            descriptor: MetricDescriptor::for_property(subsystem, property, labels, kind),
        }
    }

    /// Metric with an explicit descriptor.
    pub fn with_descriptor(
        property: &'static str,
        rule: Rule,
        descriptor: Arc<MetricDescriptor>,
    ) -> Self {
        Self {
            property,
            rule,
            descriptor,
        }
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    /// Normalize the property from `record` and emit it.
    pub fn emit(&self, ctx: &ScrapeContext<'_>, record: &Record, labels: &[&str]) {
        self.emit_value(ctx, record.get(self.property), labels);
    }

    /// Normalize `raw` and emit it.
    ///
    /// Absent values emit nothing. Parse failures are logged and skipped.
    pub fn emit_value(&self, ctx: &ScrapeContext<'_>, raw: Option<&str>, labels: &[&str]) {
        match self.rule.apply(raw) {
            Ok(Some(value)) => ctx.emit(&self.descriptor, value, labels),
            Ok(None) => {}
            Err(e) => tracing::error!(
                device = %ctx.device().name,
                property = self.property,
                value = raw.unwrap_or_default(),
                labels = ?labels,
                error = %e,
                "Failed to parse property value"
            ),
        }
    }
}

/// A `"<tx>,<rx>"` property split into `tx_<property>` and `rx_<property>`
/// counters.
#[derive(Debug)]
pub struct PairMetric {
    property: &'static str,
    tx: Arc<MetricDescriptor>,
    rx: Arc<MetricDescriptor>,
}

impl PairMetric {
    pub fn new(subsystem: &str, property: &'static str, labels: &[&'static str]) -> Self {
        Self {
            property,
            tx: MetricDescriptor::for_property(
                subsystem,
                &format!("tx_{property}"),
                labels,
                ValueKind::Counter,
            ),
            rx: MetricDescriptor::for_property(
                subsystem,
                &format!("rx_{property}"),
                labels,
                ValueKind::Counter,
            ),
        }
    }

    pub fn descriptors(&self) -> [Arc<MetricDescriptor>; 2] {
        [Arc::clone(&self.tx), Arc::clone(&self.rx)]
    }

    pub fn emit(&self, ctx: &ScrapeContext<'_>, record: &Record, labels: &[&str]) {
        let raw = record.value(self.property);
        if raw.is_empty() {
            return;
        }
        match split_pair(raw) {
            Ok((tx, rx)) => {
                ctx.emit(&self.tx, tx, labels);
                ctx.emit(&self.rx, rx, labels);
            }
            Err(e) => tracing::error!(
                device = %ctx.device().name,
                property = self.property,
                value = raw,
                labels = ?labels,
                error = %e,
                "Failed to parse counter pair"
            ),
        }
    }
}

/// `=.proplist=` argument restricting a query to the given columns.
pub fn proplist<'a>(props: impl IntoIterator<Item = &'a str>) -> String {
    format!("=.proplist={}", props.into_iter().collect::<Vec<_>>().join(","))
}

/// Names of every row returned by `command` with the given filters.
pub async fn fetch_names(
    ctx: &mut ScrapeContext<'_>,
    command: &str,
    filters: &[&str],
) -> Result<Vec<String>, CollectorError> {
    let mut args = filters.to_vec();
    args.push("=.proplist=name");
    let reply = ctx.run(command, &args).await?;
    Ok(reply
        .re
        .iter()
        .map(|row| row.value("name").to_string())
        .collect())
}

/// Run a `count-only` query and return its `ret` value.
///
/// An empty or missing `ret` yields `None`; a non-numeric one fails the
/// query.
pub async fn count_only(
    ctx: &mut ScrapeContext<'_>,
    command: &str,
    filters: &[&str],
) -> Result<Option<f64>, CollectorError> {
    let mut args = filters.to_vec();
    args.push("=count-only=");
    let reply = ctx.run(command, &args).await?;

    match reply.done_value("ret") {
        None | Some("") => Ok(None),
        Some(ret) => ret
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| CollectorError::InvalidCount {
                command: command.to_string(),
                value: ret.to_string(),
            }),
    }
}

/// Run a `monitor`/`info` style command once over the named entities.
pub async fn monitor_once(
    ctx: &mut ScrapeContext<'_>,
    command: &str,
    names: &[String],
    props: &[&str],
) -> Result<Vec<Record>, CollectorError> {
    let numbers = format!("=numbers={}", names.join(","));
    let columns = proplist(std::iter::once("name").chain(props.iter().copied()));
    let reply = ctx.run(command, &[numbers.as_str(), "=once=", columns.as_str()]).await?;
    Ok(reply.re)
}
