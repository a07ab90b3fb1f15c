//! RouterOS management API client.
//!
//! Thin request/response layer over the RouterOS API wire protocol. The
//! scrape engine only depends on the [`Connection`] and [`Dialer`] traits, so
//! tests can substitute scripted devices.
//!
//! - [`proto`]: word/sentence framing and reply types
//! - [`ApiClient`]: a [`Connection`] over any async byte stream
//! - [`NetworkDialer`]: plain TCP or TLS dialing

mod client;
pub mod proto;
mod tls;

pub use client::{ApiClient, Connection, Dialer, NetworkDialer};
pub use proto::{Record, Reply};
pub use tls::{TlsSettings, client_config};

use thiserror::Error;

/// Default API port for plain connections.
pub const API_PORT: u16 = 8728;

/// Default API port for TLS connections.
pub const API_PORT_TLS: u16 = 8729;

/// Errors raised by the API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport I/O failure (dial, read, write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake failure.
    #[error("tls error: {0}")]
    Tls(String),

    /// The device rejected the command.
    #[error("{command}: from RouterOS device: {message}")]
    Trap { command: String, message: String },

    /// The device is closing the connection.
    #[error("fatal reply from RouterOS device: {0}")]
    Fatal(String),

    /// Malformed framing or unexpected reply word.
    #[error("protocol error: {0}")]
    Protocol(String),
}
