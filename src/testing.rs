//! Scripted device doubles for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{ApiError, Connection, Dialer, Record, Reply, TlsSettings};
use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{DeviceIdentity, Observation, channel};
use crate::session::Session;

pub(crate) type RequestLog = Arc<Mutex<Vec<Vec<String>>>>;

enum Step {
    Reply(Reply),
    Trap(String),
    Io(std::io::ErrorKind),
    Delay(Duration, Reply),
    Hang,
}

/// Connection that answers a fixed sequence of commands.
pub(crate) struct ScriptedConnection {
    steps: VecDeque<(String, Step)>,
    log: RequestLog,
    closed: Arc<AtomicBool>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connection that accepts the modern login first.
    pub fn logged_in() -> Self {
        Self::new().reply("/login", Reply::completed())
    }

    pub fn reply(mut self, command: &str, reply: Reply) -> Self {
        self.steps.push_back((command.to_string(), Step::Reply(reply)));
        self
    }

    pub fn rows(self, command: &str, rows: Vec<Record>) -> Self {
        self.reply(command, Reply::with_rows(rows))
    }

    pub fn count(self, command: &str, ret: &str) -> Self {
        self.reply(command, Reply::completed_with([("ret", ret)]))
    }

    pub fn trap(mut self, command: &str, message: &str) -> Self {
        self.steps
            .push_back((command.to_string(), Step::Trap(message.to_string())));
        self
    }

    pub fn io_error(mut self, command: &str, kind: std::io::ErrorKind) -> Self {
        self.steps.push_back((command.to_string(), Step::Io(kind)));
        self
    }

    pub fn delayed(mut self, command: &str, delay: Duration, reply: Reply) -> Self {
        self.steps
            .push_back((command.to_string(), Step::Delay(delay, reply)));
        self
    }

    pub fn hang(mut self, command: &str) -> Self {
        self.steps.push_back((command.to_string(), Step::Hang));
        self
    }

    pub fn log(&self) -> RequestLog {
        Arc::clone(&self.log)
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Connection for ScriptedConnection {
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<Reply, ApiError> {
        let mut request = vec![command.to_string()];
        request.extend(args.iter().map(|a| a.to_string()));
        self.log.lock().unwrap().push(request);

        let Some((expected, step)) = self.steps.pop_front() else {
            return Err(ApiError::Protocol(format!("unscripted command {command}")));
        };
        if expected != command {
            return Err(ApiError::Protocol(format!(
                "expected {expected}, got {command}"
            )));
        }

        match step {
            Step::Reply(reply) => Ok(reply),
            Step::Trap(message) => Err(ApiError::Trap {
                command: command.to_string(),
                message,
            }),
            Step::Io(kind) => Err(ApiError::Io(kind.into())),
            Step::Delay(delay, reply) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            Step::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Dialer handing out pre-built connections, one per dial.
///
/// Connections registered for a specific host are only handed to dials of
/// that host; unkeyed ones go to whichever dial comes first.
pub(crate) struct ScriptedDialer {
    conns: Mutex<Vec<(Option<String>, ScriptedConnection)>>,
}

impl ScriptedDialer {
    pub fn new(conn: ScriptedConnection) -> Self {
        Self::many(vec![conn])
    }

    pub fn many(conns: Vec<ScriptedConnection>) -> Self {
        Self {
            conns: Mutex::new(conns.into_iter().map(|c| (None, c)).collect()),
        }
    }

    pub fn by_host(conns: Vec<(&str, ScriptedConnection)>) -> Self {
        Self {
            conns: Mutex::new(
                conns
                    .into_iter()
                    .map(|(h, c)| (Some(h.to_string()), c))
                    .collect(),
            ),
        }
    }

    /// Every dial is refused.
    pub fn unreachable() -> Self {
        Self::many(Vec::new())
    }
}

#[async_trait::async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(
        &self,
        host: &str,
        _port: u16,
        _tls: Option<&TlsSettings>,
    ) -> Result<Box<dyn Connection>, ApiError> {
        let conn = {
            let mut conns = self.conns.lock().unwrap();
            conns
                .iter()
                .position(|(h, _)| h.as_deref().is_none_or(|h| h == host))
                .map(|idx| conns.remove(idx).1)
        };
        match conn {
            Some(conn) => Ok(Box::new(conn)),
            None => Err(ApiError::Io(std::io::ErrorKind::ConnectionRefused.into())),
        }
    }
}

/// Build a record from literal pairs.
pub(crate) fn record(pairs: &[(&str, &str)]) -> Record {
    pairs.iter().copied().collect()
}

/// Outcome of running one collector against a scripted device.
pub(crate) struct CollectRun {
    pub result: Result<(), CollectorError>,
    pub observations: Vec<Observation>,
    pub requests: Vec<Vec<String>>,
}

impl CollectRun {
    /// `(metric name, labels, value)` triples in emission order.
    pub fn samples(&self) -> Vec<(String, Vec<String>, f64)> {
        self.observations
            .iter()
            .map(|o| (o.descriptor.fq_name().to_string(), o.labels.clone(), o.value))
            .collect()
    }

    pub fn value(&self, name: &str, labels: &[&str]) -> Option<f64> {
        self.observations
            .iter()
            .find(|o| o.descriptor.fq_name() == name && o.labels == labels)
            .map(|o| o.value)
    }
}

/// Run `collector` once over `conn`, which must already be logged in.
pub(crate) async fn collect_with(
    collector: &dyn Collector,
    conn: ScriptedConnection,
) -> CollectRun {
    let log = conn.log();
    let mut session = Session::from_connection(Box::new(conn));
    let (sink, stream) = channel();
    let device = Arc::new(DeviceIdentity::new("router", "192.0.2.1"));
    let result = {
        let mut ctx = ScrapeContext::new(&mut session, &sink, device);
        collector.collect(&mut ctx).await
    };
    let requests = log.lock().unwrap().clone();
    CollectRun {
        result,
        observations: stream.drain(),
        requests,
    }
}
