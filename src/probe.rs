//! Request resolution for `/probe` and `/metrics`.
//!
//! A [`Module`] is the runtime form of a configured module: resolved
//! credentials, prepared TLS settings and a collector registry built once.
//! [`Prober`] turns probe parameters or the static device list into
//! [`ScrapeJob`]s and runs them.

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{Dialer, TlsSettings, client_config};
use crate::collector::CollectorRegistry;
use crate::config::{AppConfig, ConfigError, ModuleConfig};
use crate::metrics::{Observation, channel};
use crate::scrape::{ScrapeJob, Scraper};
use crate::session::{Credentials, DeviceTarget};

/// A probe request that cannot be served.
///
/// Display strings double as the HTTP 400 response body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("no target")]
    MissingTarget,

    #[error("invalid module")]
    InvalidModule,

    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// Runtime form of a configured module.
#[derive(Debug)]
pub struct Module {
    name: String,
    credentials: Credentials,
    tls: Option<TlsSettings>,
    port: u16,
    timeout: Duration,
    registry: Arc<CollectorRegistry>,
}

impl Module {
    /// Build a module, loading TLS trust roots if configured.
    pub fn from_config(name: &str, config: &ModuleConfig) -> Result<Self, ConfigError> {
        let tls = if config.enable_tls {
            let settings = client_config(config.ca_cert.as_deref(), config.insecure_tls)
                .map_err(|e| ConfigError::invalid(format!("module '{name}': {e}")))?;
            Some(settings)
        } else {
            None
        };

        Ok(Self {
            name: name.to_string(),
            credentials: config.credentials()?,
            tls,
            port: config.api_port(),
            timeout: config.timeout,
            registry: Arc::new(CollectorRegistry::from_features(&config.features.enabled())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<CollectorRegistry> {
        &self.registry
    }

    /// A target at `address` using this module's credentials.
    pub fn target(&self, address: &str, port: Option<u16>) -> DeviceTarget {
        let mut target = DeviceTarget::new(
            address,
            port.unwrap_or(self.port),
            self.credentials.clone(),
        );
        if let Some(tls) = &self.tls {
            target = target.with_tls(tls.clone());
        }
        target
    }

    pub fn job(&self, target: DeviceTarget) -> ScrapeJob {
        ScrapeJob::new(target, Arc::clone(&self.registry), self.timeout)
    }
}

/// Split `host`, `host:port`, `[v6]:port` or a bare IPv6 address.
pub fn parse_target(target: &str) -> Result<(String, Option<u16>), ProbeError> {
    let invalid = |reason: &str| ProbeError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let target = target.trim();
    if target.is_empty() {
        return Err(ProbeError::MissingTarget);
    }

    let (host, port) = if let Some(rest) = target.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or_else(|| invalid("unclosed '['"))?;
        host.parse::<Ipv6Addr>()
            .map_err(|_| invalid("not an IPv6 address"))?;
        match rest {
            "" => (host, None),
            _ => {
                let port = rest.strip_prefix(':').ok_or_else(|| invalid("expected ':port'"))?;
                (host, Some(port))
            }
        }
    } else if target.matches(':').count() > 1 {
        target
            .parse::<Ipv6Addr>()
            .map_err(|_| invalid("not an IPv6 address"))?;
        (target, None)
    } else {
        match target.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (target, None),
        }
    };

    if host.is_empty() {
        return Err(invalid("empty host"));
    }
    if host.contains(|c: char| c.is_whitespace() || c == '/') {
        return Err(invalid("malformed host"));
    }

    let port = match port {
        None => None,
        Some(port) => match port.parse::<u16>() {
            Ok(0) | Err(_) => return Err(invalid("invalid port")),
            Ok(port) => Some(port),
        },
    };

    Ok((host.to_string(), port))
}

/// Resolves probe requests and static devices into scrapes.
#[derive(Debug)]
pub struct Prober {
    scraper: Scraper,
    modules: HashMap<String, Arc<Module>>,
    devices: Vec<ScrapeJob>,
}

impl Prober {
    /// Build every module and the static device jobs.
    ///
    /// # Errors
    /// Returns `ConfigError` if a module's TLS settings cannot be loaded or a
    /// device references an unknown module.
    pub fn from_config(config: &AppConfig, dialer: Arc<dyn Dialer>) -> Result<Self, ConfigError> {
        let mut modules = HashMap::with_capacity(config.modules.len());
        for (name, module) in &config.modules {
            let module = Module::from_config(name, module)?;
            tracing::debug!(
                module = name.as_str(),
                collectors = ?module.registry.names(),
                "Module ready"
            );
            modules.insert(name.clone(), Arc::new(module));
        }

        let devices = config
            .devices
            .iter()
            .map(|device| {
                let module = modules.get(&device.module).ok_or_else(|| {
                    ConfigError::invalid(format!("unknown module '{}'", device.module))
                })?;
                let target = module.target(&device.address, device.port);
                Ok(match &device.name {
                    Some(name) => module.job(target.with_name(name)),
                    None => module.job(target).with_identity_lookup(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            scraper: Scraper::new(dialer),
            modules,
            devices,
        })
    }

    pub fn module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.get(name)
    }

    pub fn devices(&self) -> &[ScrapeJob] {
        &self.devices
    }

    /// Turn probe query parameters into a job without touching the network.
    pub fn resolve(
        &self,
        target: Option<&str>,
        module: Option<&str>,
    ) -> Result<ScrapeJob, ProbeError> {
        let target = target
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProbeError::MissingTarget)?;
        let module = module
            .and_then(|m| self.modules.get(m))
            .ok_or(ProbeError::InvalidModule)?;
        let (host, port) = parse_target(target)?;
        Ok(module.job(module.target(&host, port)))
    }

    /// Run one scrape and collect its observations.
    pub async fn probe(&self, job: &ScrapeJob, cancel: &CancellationToken) -> Vec<Observation> {
        let (sink, stream) = channel();
        self.scraper.scrape(job, &sink, cancel).await;
        drop(sink);
        stream.drain()
    }

    /// Scrape every static device concurrently.
    pub async fn scrape_devices(&self, cancel: &CancellationToken) -> Vec<Observation> {
        let (sink, stream) = channel();
        let outcomes = self
            .scraper
            .scrape_all(self.devices.clone(), &sink, cancel)
            .await;
        drop(sink);
        let failed = outcomes.iter().filter(|o| !o.success()).count();
        tracing::debug!(devices = outcomes.len(), failed, "Device fan-out complete");
        stream.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Feature;
    use crate::config::{DeviceConfig, Features};
    use crate::testing::{ScriptedConnection, ScriptedDialer, record};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.modules.insert(
            "default".to_string(),
            ModuleConfig {
                username: Some("admin".to_string()),
                password: Some("secret".to_string()),
                features: Features {
                    interface: false,
                    ..Features::default()
                },
                ..ModuleConfig::default()
            },
        );
        config
    }

    fn prober(config: &AppConfig, dialer: ScriptedDialer) -> Prober {
        Prober::from_config(config, Arc::new(dialer)).unwrap()
    }

    #[test]
    fn test_parse_target_forms() {
        assert_eq!(parse_target("10.0.0.1"), Ok(("10.0.0.1".to_string(), None)));
        assert_eq!(
            parse_target("router.lan:8729"),
            Ok(("router.lan".to_string(), Some(8729)))
        );
        assert_eq!(
            parse_target("[2001:db8::1]:8728"),
            Ok(("2001:db8::1".to_string(), Some(8728)))
        );
        assert_eq!(
            parse_target("[2001:db8::1]"),
            Ok(("2001:db8::1".to_string(), None))
        );
        assert_eq!(
            parse_target("2001:db8::1"),
            Ok(("2001:db8::1".to_string(), None))
        );
    }

    #[test]
    fn test_parse_target_rejects_malformed() {
        assert_eq!(parse_target("  "), Err(ProbeError::MissingTarget));
        for bad in [
            "10.0.0.1:",
            "10.0.0.1:0",
            "10.0.0.1:http",
            "10.0.0.1:70000",
            ":8728",
            "[2001:db8::1",
            "[router]:8728",
            "[2001:db8::1]8728",
            "fe80::zz::1",
            "http://10.0.0.1",
        ] {
            assert!(
                matches!(parse_target(bad), Err(ProbeError::InvalidTarget { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_resolve_errors_without_io() {
        let prober = prober(&config(), ScriptedDialer::unreachable());
        assert_eq!(
            prober.resolve(None, Some("default")).unwrap_err(),
            ProbeError::MissingTarget
        );
        assert_eq!(
            prober.resolve(Some(""), Some("default")).unwrap_err(),
            ProbeError::MissingTarget
        );
        assert_eq!(
            prober.resolve(Some("10.0.0.1"), None).unwrap_err(),
            ProbeError::InvalidModule
        );
        assert_eq!(
            prober.resolve(Some("10.0.0.1"), Some("other")).unwrap_err(),
            ProbeError::InvalidModule
        );
        assert_eq!(prober.resolve(None, None).unwrap_err(), ProbeError::MissingTarget);
        assert_eq!(ProbeError::InvalidModule.to_string(), "invalid module");
        assert_eq!(ProbeError::MissingTarget.to_string(), "no target");
    }

    #[test]
    fn test_resolve_builds_job() {
        let prober = prober(&config(), ScriptedDialer::unreachable());
        let job = prober.resolve(Some("10.0.0.1:18728"), Some("default")).unwrap();
        assert_eq!(job.target.address, "10.0.0.1");
        assert_eq!(job.target.port, 18728);
        assert!(job.target.name.is_none());
        assert!(!job.resolve_identity);
        assert_eq!(job.timeout, Duration::from_secs(5));
        assert_eq!(job.registry.names(), vec!["resource"]);

        let job = prober.resolve(Some("10.0.0.1"), Some("default")).unwrap();
        assert_eq!(job.target.port, 8728);
    }

    #[test]
    fn test_module_tls_port() {
        let module = Module::from_config(
            "tls",
            &ModuleConfig {
                username: Some("a".to_string()),
                password: Some("b".to_string()),
                enable_tls: true,
                insecure_tls: true,
                ..ModuleConfig::default()
            },
        )
        .unwrap();
        let target = module.target("10.0.0.1", None);
        assert_eq!(target.port, 8729);
        assert!(target.tls.is_some());
        assert_eq!(module.name(), "tls");
    }

    #[test]
    fn test_static_devices() {
        let mut config = config();
        config.devices = vec![
            DeviceConfig {
                name: Some("core".to_string()),
                address: "10.0.0.1".to_string(),
                port: None,
                module: "default".to_string(),
            },
            DeviceConfig {
                name: None,
                address: "10.0.0.2".to_string(),
                port: Some(9000),
                module: "default".to_string(),
            },
        ];
        let prober = prober(&config, ScriptedDialer::unreachable());
        let devices = prober.devices();
        assert_eq!(devices[0].target.name.as_deref(), Some("core"));
        assert!(!devices[0].resolve_identity);
        assert!(devices[1].resolve_identity);
        assert_eq!(devices[1].target.port, 9000);
        assert!(prober.module("default").is_some());
    }

    #[tokio::test]
    async fn test_probe_collects_observations() {
        let conn = ScriptedConnection::logged_in().rows(
            "/system/resource/print",
            vec![record(&[
                ("free-memory", "1024"),
                ("total-memory", "2048"),
                ("cpu-load", "3"),
                ("free-hdd-space", "10"),
                ("total-hdd-space", "20"),
                ("uptime", "1h"),
                ("board-name", "RB5009"),
                ("version", "7.15"),
            ])],
        );
        let prober = prober(&config(), ScriptedDialer::new(conn));
        let job = prober.resolve(Some("10.0.0.1"), Some("default")).unwrap();

        let observations = prober.probe(&job, &CancellationToken::new()).await;
        let names: Vec<&str> = observations.iter().map(|o| o.descriptor.fq_name()).collect();
        assert!(names.contains(&"mikrotik_system_free_memory"));
        let success = observations
            .iter()
            .find(|o| o.descriptor.fq_name() == "mikrotik_scrape_collector_success")
            .unwrap();
        assert_eq!(success.value, 1.0);
    }

    #[tokio::test]
    async fn test_unreachable_probe_reports_failure() {
        let prober = prober(&config(), ScriptedDialer::unreachable());
        let job = prober.resolve(Some("10.0.0.1"), Some("default")).unwrap();

        let observations = prober.probe(&job, &CancellationToken::new()).await;
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].value, 0.0);
    }

    #[tokio::test]
    async fn test_scrape_devices_fan_out() {
        let mut config = config();
        config.modules.get_mut("default").unwrap().features = Features {
            resource: false,
            interface: false,
            conntrack: true,
            ..Features::default()
        };
        config.devices = ["10.0.0.1", "10.0.0.2"]
            .iter()
            .map(|address| DeviceConfig {
                name: Some(format!("r-{address}")),
                address: address.to_string(),
                port: None,
                module: "default".to_string(),
            })
            .collect();
        let conn = ScriptedConnection::logged_in().rows(
            "/ip/firewall/connection/tracking/print",
            vec![record(&[("total-entries", "12"), ("max-entries", "4096")])],
        );
        let prober = prober(&config, ScriptedDialer::by_host(vec![("10.0.0.1", conn)]));
        assert_eq!(
            prober.module("default").unwrap().registry().names(),
            vec![Feature::Conntrack.as_ref()]
        );

        let observations = prober.scrape_devices(&CancellationToken::new()).await;
        let success: Vec<(String, f64)> = observations
            .iter()
            .filter(|o| o.descriptor.fq_name() == "mikrotik_scrape_collector_success")
            .map(|o| (o.device.name.clone(), o.value))
            .collect();
        assert_eq!(success.len(), 2);
        assert!(success.contains(&("r-10.0.0.1".to_string(), 1.0)));
        assert!(success.contains(&("r-10.0.0.2".to_string(), 0.0)));
    }
}
