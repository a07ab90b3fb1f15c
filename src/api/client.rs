//! Request/response client over a RouterOS API byte stream.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;

use super::ApiError;
use super::proto::{Reply, Sentence, read_sentence, write_sentence};
use super::tls::TlsSettings;

/// An open, exclusively owned connection to one device.
///
/// Requests are strictly sequential: `run` takes `&mut self`, so no two
/// callers can interleave sentences on the same stream.
#[async_trait::async_trait]
pub trait Connection: Send {
    /// Issue `command` with `args` and wait for its completion.
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<Reply, ApiError>;

    /// Shut the transport down. Dropping the connection also closes it.
    async fn close(&mut self) {}
}

/// Opens transport connections to devices.
#[async_trait::async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(
        &self,
        host: &str,
        port: u16,
        tls: Option<&TlsSettings>,
    ) -> Result<Box<dyn Connection>, ApiError>;
}

/// API client over any async byte stream.
pub struct ApiClient<S> {
    stream: BufStream<S>,
}

impl<S> ApiClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }
}

impl<S> std::fmt::Debug for ApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<S> Connection for ApiClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<Reply, ApiError> {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(command);
        words.extend_from_slice(args);
        write_sentence(&mut self.stream, &words).await?;

        let mut reply = Reply::default();
        let mut trap: Option<String> = None;
        loop {
            let sentence = Sentence::from_words(read_sentence(&mut self.stream).await?)?;
            match sentence.word.as_str() {
                "!re" => reply.re.push(sentence.record),
                "!done" => {
                    reply.done = Some(sentence.record);
                    break;
                }
                "!trap" => {
                    // Only the first trap is reported; the device still sends !done.
                    if trap.is_none() {
                        trap = Some(sentence.record.value("message").to_string());
                    }
                }
                "!empty" => {}
                "!fatal" => return Err(ApiError::Fatal(sentence.extra.join(" "))),
                other => {
                    return Err(ApiError::Protocol(format!(
                        "unexpected reply word '{other}'"
                    )));
                }
            }
        }

        match trap {
            Some(message) => Err(ApiError::Trap {
                command: command.to_string(),
                message,
            }),
            None => Ok(reply),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "Error shutting down API connection");
        }
    }
}

/// Dials devices over the network, with optional TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDialer;

#[async_trait::async_trait]
impl Dialer for NetworkDialer {
    async fn dial(
        &self,
        host: &str,
        port: u16,
        tls: Option<&TlsSettings>,
    ) -> Result<Box<dyn Connection>, ApiError> {
        let tcp = TcpStream::connect((host, port)).await?;
        tcp.set_nodelay(true)?;

        let Some(tls) = tls else {
            return Ok(Box::new(ApiClient::new(tcp)));
        };

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ApiError::Tls(format!("invalid server name '{host}': {e}")))?;
        let connector = TlsConnector::from(Arc::clone(tls.config()));
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ApiError::Tls(e.to_string()))?;
        Ok(Box::new(ApiClient::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::proto::encode_sentence;
    use tokio::io::{AsyncReadExt, duplex};

    fn device_bytes(sentences: &[&[&str]]) -> Vec<u8> {
        sentences.iter().flat_map(|s| encode_sentence(*s)).collect()
    }

    #[tokio::test]
    async fn test_run_collects_rows_until_done() {
        let (client_io, mut device_io) = duplex(4096);
        let mut client = ApiClient::new(client_io);

        let device = tokio::spawn(async move {
            let request = read_sentence(&mut device_io).await.unwrap();
            let bytes = device_bytes(&[
                &["!re", "=name=ether1"],
                &["!re", "=name=ether2"],
                &["!done", "=ret=2"],
            ]);
            device_io.write_all(&bytes).await.unwrap();
            request
        });

        let reply = client
            .run("/interface/print", &["=.proplist=name"])
            .await
            .unwrap();
        assert_eq!(reply.re.len(), 2);
        assert_eq!(reply.re[1].get("name"), Some("ether2"));
        assert_eq!(reply.done_value("ret"), Some("2"));

        let request = device.await.unwrap();
        assert_eq!(request, vec!["/interface/print", "=.proplist=name"]);
    }

    #[tokio::test]
    async fn test_trap_is_reported_after_done() {
        let (client_io, mut device_io) = duplex(4096);
        let mut client = ApiClient::new(client_io);

        tokio::spawn(async move {
            let _ = read_sentence(&mut device_io).await.unwrap();
            let bytes = device_bytes(&[
                &["!trap", "=message=no such command"],
                &["!done"],
                // Next reply on the same stream must still be readable.
            ]);
            device_io.write_all(&bytes).await.unwrap();
            let _ = read_sentence(&mut device_io).await.unwrap();
            device_io
                .write_all(&device_bytes(&[&["!done"]]))
                .await
                .unwrap();
        });

        let err = client.run("/bogus", &[]).await.unwrap_err();
        match err {
            ApiError::Trap { command, message } => {
                assert_eq!(command, "/bogus");
                assert_eq!(message, "no such command");
            }
            other => panic!("expected trap, got {other:?}"),
        }

        let reply = client.run("/system/identity/print", &[]).await.unwrap();
        assert!(reply.re.is_empty());
        assert!(reply.done.is_some());
    }

    #[tokio::test]
    async fn test_fatal_aborts() {
        let (client_io, mut device_io) = duplex(4096);
        let mut client = ApiClient::new(client_io);

        tokio::spawn(async move {
            let _ = read_sentence(&mut device_io).await.unwrap();
            device_io
                .write_all(&device_bytes(&[&["!fatal", "session terminated"]]))
                .await
                .unwrap();
        });

        let err = client.run("/quit", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Fatal(ref m) if m == "session terminated"));
    }

    #[tokio::test]
    async fn test_eof_is_io_error() {
        let (client_io, device_io) = duplex(64);
        drop(device_io);
        let mut client = ApiClient::new(client_io);
        let err = client.run("/interface/print", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Io(_)));
    }

    #[tokio::test]
    async fn test_close_shuts_down_stream() {
        let (client_io, mut device_io) = duplex(64);
        let mut client = ApiClient::new(client_io);
        client.close().await;
        let mut buf = [0u8; 1];
        assert_eq!(device_io.read(&mut buf).await.unwrap(), 0);
    }
}
