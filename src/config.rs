//! Configuration for the exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (bind address, port)
//! - Modules: credentials, TLS and the enabled collector set
//! - Static devices scraped by `/metrics`

mod app;
mod validation;

pub use app::{
    AppConfig, DEFAULT_PORT, DEFAULT_TIMEOUT, DeviceConfig, Features, ModuleConfig, ServerConfig,
};
pub use validation::{ConfigError, expand_env_vars};
