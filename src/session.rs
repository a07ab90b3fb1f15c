//! Device session establishment.
//!
//! A [`Session`] is one authenticated API connection bound to one
//! [`DeviceTarget`]. Login supports both the single round-trip method used by
//! current firmware and the legacy two-phase challenge/response method.

use std::path::PathBuf;

use md5::{Digest, Md5};
use thiserror::Error;

use crate::api::{ApiError, Connection, Dialer, Reply, TlsSettings};

/// Errors that prevent a session from being established.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Dial or TLS failure.
    #[error("connection to {address} failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: ApiError,
    },

    /// Login rejected or an unexpected login reply shape.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Credentials could not be resolved (e.g. unreadable file).
    #[error("credentials unavailable: {0}")]
    Credentials(String),
}

/// Where a credential value comes from.
///
/// `Debug` never prints inline values.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Inline(String),
    File(PathBuf),
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => f.debug_tuple("Inline").field(&"***").finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl Secret {
    /// Resolve the value, reading the file if necessary.
    ///
    /// File contents have trailing whitespace removed.
    pub fn resolve(&self) -> Result<String, SessionError> {
        match self {
            Self::Inline(value) => Ok(value.clone()),
            Self::File(path) => std::fs::read_to_string(path)
                .map(|s| s.trim_end().to_string())
                .map_err(|e| SessionError::Credentials(format!("{}: {e}", path.display()))),
        }
    }
}

/// Username and password sources for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Secret,
    pub password: Secret,
}

impl Credentials {
    pub fn inline(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Secret::Inline(username.into()),
            password: Secret::Inline(password.into()),
        }
    }
}

/// One device to scrape. Immutable for the duration of a scrape.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    /// Display name. `None` means "ask the device for its identity".
    pub name: Option<String>,
    pub address: String,
    pub port: u16,
    pub credentials: Credentials,
    pub tls: Option<TlsSettings>,
}

impl DeviceTarget {
    pub fn new(address: impl Into<String>, port: u16, credentials: Credentials) -> Self {
        Self {
            name: None,
            address: address.into(),
            port,
            credentials,
            tls: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// `address:port` form used in logs.
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// Compute the legacy login response token.
///
/// `"00"` followed by the hex MD5 digest of a zero byte, the password and
/// the raw challenge bytes.
pub fn challenge_response(challenge: &[u8], password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update(challenge);
    format!("00{}", hex::encode(hasher.finalize()))
}

/// Run the login handshake on an open connection.
pub async fn login(
    conn: &mut dyn Connection,
    username: &str,
    password: &str,
) -> Result<(), SessionError> {
    let name_arg = format!("=name={username}");
    let password_arg = format!("=password={password}");
    let reply = conn
        .run("/login", &[name_arg.as_str(), password_arg.as_str()])
        .await
        .map_err(login_error)?;

    match login_challenge(&reply)? {
        None => Ok(()),
        Some(challenge) => {
            tracing::debug!("Device requested legacy challenge login");
            let response_arg = format!("=response={}", challenge_response(&challenge, password));
            conn.run("/login", &[name_arg.as_str(), response_arg.as_str()])
                .await
                .map_err(login_error)?;
            Ok(())
        }
    }
}

/// Inspect the first login reply: `Ok(None)` means logged in.
fn login_challenge(reply: &Reply) -> Result<Option<Vec<u8>>, SessionError> {
    let Some(done) = reply.done.as_ref() else {
        return Err(SessionError::Authentication(
            "/login: no completion and no challenge received".to_string(),
        ));
    };
    match done.get("ret") {
        None => Ok(None),
        Some(ret) => hex::decode(ret).map(Some).map_err(|e| {
            SessionError::Authentication(format!(
                "/login: invalid challenge hex string received: {e}"
            ))
        }),
    }
}

fn login_error(err: ApiError) -> SessionError {
    match err {
        ApiError::Trap { message, .. } => SessionError::Authentication(message),
        other => SessionError::Authentication(other.to_string()),
    }
}

/// An authenticated connection to one device.
pub struct Session {
    conn: Box<dyn Connection>,
}

impl Session {
    /// Dial `target` and log in.
    pub async fn open(dialer: &dyn Dialer, target: &DeviceTarget) -> Result<Self, SessionError> {
        let username = target.credentials.username.resolve()?;
        let password = target.credentials.password.resolve()?;

        let mut conn = dialer
            .dial(&target.address, target.port, target.tls.as_ref())
            .await
            .map_err(|source| SessionError::Connection {
                address: target.endpoint(),
                source,
            })?;
        tracing::debug!(endpoint = %target.endpoint(), "Connected, logging in");

        if let Err(e) = login(conn.as_mut(), &username, &password).await {
            conn.close().await;
            return Err(e);
        }
        tracing::debug!(endpoint = %target.endpoint(), "Login complete");

        Ok(Self { conn })
    }

    /// Wrap an already authenticated connection.
    pub fn from_connection(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }

    /// Issue one command.
    pub async fn run(&mut self, command: &str, args: &[&str]) -> Result<Reply, ApiError> {
        self.conn.run(command, args).await
    }

    /// The device's configured identity, if it reports one.
    pub async fn identity(&mut self) -> Result<Option<String>, ApiError> {
        let reply = self.run("/system/identity/print", &[]).await?;
        Ok(reply
            .re
            .last()
            .and_then(|r| r.get("name"))
            .filter(|n| !n.is_empty())
            .map(str::to_string))
    }

    /// Close the underlying connection.
    pub async fn close(mut self) {
        self.conn.close().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
