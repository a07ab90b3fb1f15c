//! Application configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{API_PORT, API_PORT_TLS};
use crate::collector::Feature;
use crate::session::{Credentials, Secret};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default listen port of the exporter.
pub const DEFAULT_PORT: u16 = 9436;

/// Default per-scrape deadline (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 9436).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Module Configuration
// =============================================================================

/// Enabled collectors of a module.
///
/// `resource` and `interface` are on unless switched off; everything else
/// is opt-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    pub resource: bool,
    pub interface: bool,
    pub bgp: bool,
    pub conntrack: bool,
    pub dhcp: bool,
    pub dhcpl: bool,
    pub dhcpv6: bool,
    pub firmware: bool,
    pub health: bool,
    pub routes: bool,
    pub poe: bool,
    pub pools: bool,
    pub optics: bool,
    pub w60g: bool,
    pub wlansta: bool,
    pub capsman: bool,
    pub monitor: bool,
    pub ipsec: bool,
    pub lte: bool,
    pub netwatch: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            resource: true,
            interface: true,
            bgp: false,
            conntrack: false,
            dhcp: false,
            dhcpl: false,
            dhcpv6: false,
            firmware: false,
            health: false,
            routes: false,
            poe: false,
            pools: false,
            optics: false,
            w60g: false,
            wlansta: false,
            capsman: false,
            monitor: false,
            ipsec: false,
            lte: false,
            netwatch: false,
        }
    }
}

impl Features {
    /// Whether `feature` is switched on.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Resource => self.resource,
            Feature::Interface => self.interface,
            Feature::Bgp => self.bgp,
            Feature::Conntrack => self.conntrack,
            Feature::Dhcp => self.dhcp,
            Feature::Dhcpl => self.dhcpl,
            Feature::Dhcpv6 => self.dhcpv6,
            Feature::Firmware => self.firmware,
            Feature::Health => self.health,
            Feature::Routes => self.routes,
            Feature::Poe => self.poe,
            Feature::Pools => self.pools,
            Feature::Optics => self.optics,
            Feature::W60g => self.w60g,
            Feature::Wlansta => self.wlansta,
            Feature::Capsman => self.capsman,
            Feature::Monitor => self.monitor,
            Feature::Ipsec => self.ipsec,
            Feature::Lte => self.lte,
            Feature::Netwatch => self.netwatch,
        }
    }

    /// Enabled features in registry order.
    pub fn enabled(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.is_enabled(*f))
            .collect()
    }
}

/// A named credential set plus collector selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Inline username; supports `${VAR}` expansion.
    #[serde(default)]
    pub username: Option<String>,

    /// Inline password; supports `${VAR}` expansion.
    #[serde(default)]
    pub password: Option<String>,

    /// File holding the username, read at scrape time.
    #[serde(default)]
    pub username_file: Option<PathBuf>,

    /// File holding the password, read at scrape time.
    #[serde(default)]
    pub password_file: Option<PathBuf>,

    /// Connect with TLS (API-SSL service).
    #[serde(default)]
    pub enable_tls: bool,

    /// Skip certificate verification.
    #[serde(default)]
    pub insecure_tls: bool,

    /// PEM file with the trust roots for TLS.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Per-scrape deadline (default: 5s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// API port; defaults to 8728, or 8729 with TLS.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub features: Features,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            username_file: None,
            password_file: None,
            enable_tls: false,
            insecure_tls: false,
            ca_cert: None,
            timeout: DEFAULT_TIMEOUT,
            port: None,
            features: Features::default(),
        }
    }
}

impl ModuleConfig {
    /// The API port devices of this module listen on.
    pub fn api_port(&self) -> u16 {
        match (self.port, self.enable_tls) {
            (Some(port), _) => port,
            (None, true) => API_PORT_TLS,
            (None, false) => API_PORT,
        }
    }

    /// Resolve credential sources, expanding environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if a username or password
    /// source is missing or given twice.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials {
            username: secret("username", self.username.as_deref(), self.username_file.as_deref())?,
            password: secret("password", self.password.as_deref(), self.password_file.as_deref())?,
        })
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        self.credentials()
            .map_err(|e| ConfigError::invalid(format!("module '{name}': {}", inner_message(e))))?;

        if self.port == Some(0) {
            return Err(ConfigError::invalid(format!(
                "module '{name}': port must be non-zero"
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid(format!(
                "module '{name}': timeout must be positive"
            )));
        }
        if !self.enable_tls && (self.insecure_tls || self.ca_cert.is_some()) {
            tracing::warn!(module = name, "TLS options set but enable_tls is false");
        }
        Ok(())
    }
}

fn secret(field: &str, inline: Option<&str>, file: Option<&Path>) -> Result<Secret, ConfigError> {
    match (inline, file) {
        (Some(value), None) => Ok(Secret::Inline(expand_env_vars(value))),
        (None, Some(path)) => Ok(Secret::File(PathBuf::from(expand_env_vars(
            &path.to_string_lossy(),
        )))),
        (None, None) => Err(ConfigError::invalid(format!(
            "missing {field} (set {field} or {field}_file)"
        ))),
        (Some(_), Some(_)) => Err(ConfigError::invalid(format!(
            "{field} and {field}_file are mutually exclusive"
        ))),
    }
}

fn inner_message(err: ConfigError) -> String {
    match err {
        ConfigError::ValidationError(message) => message,
        other => other.to_string(),
    }
}

// =============================================================================
// Device Configuration
// =============================================================================

/// A statically configured device scraped by `/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Display name; when absent the device's identity is queried.
    #[serde(default)]
    pub name: Option<String>,

    /// Host name or IP address.
    pub address: String,

    /// Overrides the module's port.
    #[serde(default)]
    pub port: Option<u16>,

    /// Module supplying credentials and features.
    pub module: String,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Named modules.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,

    /// Devices scraped on `/metrics`.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::invalid(format!("invalid server bind address: '{}'", self.server.bind))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server port must be non-zero"));
        }

        for (name, module) in &self.modules {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("module name cannot be empty"));
            }
            module.validate(name)?;
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.address.trim().is_empty() {
                return Err(ConfigError::invalid("device address cannot be empty"));
            }
            let label = device.name.as_deref().unwrap_or(&device.address);
            if !self.modules.contains_key(&device.module) {
                return Err(ConfigError::invalid(format!(
                    "device '{label}' references unknown module '{}'",
                    device.module
                )));
            }
            if device.port == Some(0) {
                return Err(ConfigError::invalid(format!(
                    "device '{label}': port must be non-zero"
                )));
            }
            if !seen.insert(label) {
                return Err(ConfigError::invalid(format!("duplicate device: '{label}'")));
            }
        }

        Ok(())
    }
}
