//! Scrape orchestration.
//!
//! A single-device scrape opens a session, runs the registry's collectors
//! one after another on it, closes it and always reports two meta
//! observations: wall-clock duration and success. Multi-device scrapes run
//! one such worker per target concurrently, sharing only the sink.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::api::Dialer;
use crate::collector::{CollectorError, CollectorRegistry, ScrapeContext};
use crate::metrics::{DeviceIdentity, MetricDescriptor, Observation, ObservationSink, ValueKind};
use crate::session::{DeviceTarget, Session, SessionError};

/// Upper bound on the best-effort session close after a scrape.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a device scrape failed.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("collector {collector}: {source}")]
    Collector {
        collector: &'static str,
        #[source]
        source: CollectorError,
    },

    #[error("scrape timed out after {0:?}")]
    Timeout(Duration),

    #[error("scrape cancelled")]
    Cancelled,
}

/// One device to scrape with the collectors to run against it.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub target: DeviceTarget,
    pub registry: Arc<CollectorRegistry>,
    pub timeout: Duration,
    /// Ask the device for its identity when the target has no name.
    pub resolve_identity: bool,
}

impl ScrapeJob {
    pub fn new(target: DeviceTarget, registry: Arc<CollectorRegistry>, timeout: Duration) -> Self {
        Self {
            target,
            registry,
            timeout,
            resolve_identity: false,
        }
    }

    pub fn with_identity_lookup(mut self) -> Self {
        self.resolve_identity = true;
        self
    }
}

/// Result of one device scrape, mirrored by its meta observations.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub device: Arc<DeviceIdentity>,
    pub duration: Duration,
    pub error: Option<ScrapeError>,
}

impl ScrapeOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// State a scrape leaves behind when its deadline cuts it short.
struct ScrapeState {
    session: Option<Session>,
    device: Arc<DeviceIdentity>,
}

/// Runs device scrapes.
///
/// Cheap to clone; holds the dialer and the meta descriptors.
#[derive(Clone)]
pub struct Scraper {
    dialer: Arc<dyn Dialer>,
    duration: Arc<MetricDescriptor>,
    success: Arc<MetricDescriptor>,
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper").finish_non_exhaustive()
    }
}

impl Scraper {
    pub fn new(dialer: Arc<dyn Dialer>) -> Self {
        Self {
            dialer,
            duration: MetricDescriptor::new(
                "scrape",
                "collector_duration_seconds",
                "mikrotik_exporter: duration of a device collector scrape",
                &[],
                ValueKind::Gauge,
            ),
            success: MetricDescriptor::new(
                "scrape",
                "collector_success",
                "mikrotik_exporter: whether a device collector succeeded",
                &[],
                ValueKind::Gauge,
            ),
        }
    }

    /// The two meta descriptors emitted for every scrape.
    pub fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.duration), Arc::clone(&self.success)]
    }

    /// Scrape one device.
    ///
    /// Never fails: errors are logged and reported through the outcome and
    /// the success observation.
    pub async fn scrape(
        &self,
        job: &ScrapeJob,
        sink: &ObservationSink,
        cancel: &CancellationToken,
    ) -> ScrapeOutcome {
        let span = tracing::info_span!("scrape", device = %job.target.endpoint());
        self.scrape_inner(job, sink, cancel).instrument(span).await
    }

    async fn scrape_inner(
        &self,
        job: &ScrapeJob,
        sink: &ObservationSink,
        cancel: &CancellationToken,
    ) -> ScrapeOutcome {
        let begin = Instant::now();
        let mut state = ScrapeState {
            session: None,
            device: Arc::new(DeviceIdentity::new(
                job.target
                    .name
                    .clone()
                    .unwrap_or_else(|| job.target.address.clone()),
                job.target.address.clone(),
            )),
        };

        let work = self.connect_and_collect(job, sink, &mut state);
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = tokio::time::timeout(job.timeout, work) => {
                result.unwrap_or(Err(ScrapeError::Timeout(job.timeout)))
            }
        };
        let duration = begin.elapsed();

        if let Some(session) = state.session.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, session.close()).await.is_err() {
                tracing::warn!("Timed out closing session");
            }
        }

        let success = match &result {
            Ok(()) => {
                tracing::debug!(duration = duration.as_secs_f64(), "Scrape succeeded");
                1.0
            }
            Err(e) => {
                tracing::error!(duration = duration.as_secs_f64(), error = %e, "Scrape failed");
                0.0
            }
        };

        for (descriptor, value) in [
            (&self.duration, duration.as_secs_f64()),
            (&self.success, success),
        ] {
            sink.send(Observation {
                descriptor: Arc::clone(descriptor),
                value,
                labels: Vec::new(),
                device: Arc::clone(&state.device),
            });
        }

        ScrapeOutcome {
            device: state.device,
            duration,
            error: result.err(),
        }
    }

    async fn connect_and_collect(
        &self,
        job: &ScrapeJob,
        sink: &ObservationSink,
        state: &mut ScrapeState,
    ) -> Result<(), ScrapeError> {
        let session = state
            .session
            .insert(Session::open(self.dialer.as_ref(), &job.target).await?);

        if job.resolve_identity && job.target.name.is_none() {
            match session.identity().await {
                Ok(Some(name)) => {
                    state.device = Arc::new(DeviceIdentity::new(name, job.target.address.clone()));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to fetch device identity"),
            }
        }

        let mut ctx = ScrapeContext::new(session, sink, Arc::clone(&state.device));
        for collector in job.registry.iter() {
            let span = tracing::debug_span!("collector", collector = collector.name());
            collector
                .collect(&mut ctx)
                .instrument(span)
                .await
                .map_err(|source| ScrapeError::Collector {
                    collector: collector.name(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Scrape every job concurrently and wait for all of them.
    ///
    /// A failing target never affects the others.
    pub async fn scrape_all(
        &self,
        jobs: Vec<ScrapeJob>,
        sink: &ObservationSink,
        cancel: &CancellationToken,
    ) -> Vec<ScrapeOutcome> {
        let mut tasks = JoinSet::new();
        for job in jobs {
            let scraper = self.clone();
            let sink = sink.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { scraper.scrape(&job, &sink, &cancel).await });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Scrape task aborted"),
            }
        }
        outcomes
    }
}
