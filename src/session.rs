//! One connection, one operation.
//!
//! A [`GatewaySession`] walks `Unconnected -> Handshaking -> Open -> Closed`
//! exactly once, either sending a batch of notifications or draining the
//! feedback service. The connection is shut down on every exit path before
//! the result is returned; afterwards the session only answers
//! [`ApnsError::SessionClosed`].

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{Endpoint, GatewayConfig};
use crate::credentials::Credentials;
use crate::error::{ApnsError, Result};
use crate::notification::Notification;
use crate::protocol::{encode_batch, FeedbackBuffer, FeedbackRecord};
use crate::transport::{self, with_deadline, GatewayStream};

/// Read buffer size for the feedback stream.
const FEEDBACK_READ_SIZE: usize = 4 * 1024;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing attempted yet.
    Unconnected,
    /// Loading credentials, connecting and negotiating TLS.
    Handshaking,
    /// TLS established; writing or reading.
    Open,
    /// Terminal.
    Closed,
}

/// Outcome of a send.
///
/// The gateway never acknowledges frames; it closes the connection when it
/// rejects one. A report therefore means "written, outcome unknown". Invalid
/// tokens surface later through the feedback service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Notifications written.
    pub notifications: usize,
    /// Bytes written to the TLS stream.
    pub bytes_written: usize,
    /// Whether the TLS close completed without error.
    pub clean_close: bool,
}

/// A single-use connection to the gateway or the feedback service.
#[derive(Debug)]
pub struct GatewaySession {
    config: Arc<GatewayConfig>,
    state: SessionState,
}

impl GatewaySession {
    /// Create an unconnected session.
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self {
            config,
            state: SessionState::Unconnected,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Encode `notifications` and write them to the gateway in one stream.
    ///
    /// Frames are written in input order. Nothing is read back.
    pub async fn send_notifications(&mut self, notifications: &[Notification]) -> Result<SendReport> {
        self.begin()?;
        let result = self.run_send(notifications).await;
        self.transition(SessionState::Closed);
        result
    }

    /// Drain the feedback service.
    ///
    /// Records are decoded as soon as they are complete; a partial record
    /// left when the service closes the stream is discarded.
    pub async fn fetch_feedback(&mut self) -> Result<Vec<FeedbackRecord>> {
        self.begin()?;
        let result = self.run_feedback().await;
        self.transition(SessionState::Closed);
        result
    }

    async fn run_send(&mut self, notifications: &[Notification]) -> Result<SendReport> {
        let bodies = notifications
            .iter()
            .map(Notification::packaged_notification)
            .collect::<Result<Vec<_>>>()?;
        let bytes = encode_batch(&bodies)?;

        let endpoint = self.config.gateway.clone();
        let mut stream = self.open(&endpoint).await?;

        let written = write_stream(&mut stream, &bytes, self.config.io_timeout).await;
        let clean_close = self.close(stream).await;
        written?;

        if !clean_close {
            // The gateway drops the connection when it rejects a frame.
            tracing::warn!(
                "Connection to {} did not close cleanly; a notification may have been rejected",
                endpoint
            );
        }

        tracing::debug!(
            "Wrote {} notification(s), {} bytes to {}",
            notifications.len(),
            bytes.len(),
            endpoint
        );

        Ok(SendReport {
            notifications: notifications.len(),
            bytes_written: bytes.len(),
            clean_close,
        })
    }

    async fn run_feedback(&mut self) -> Result<Vec<FeedbackRecord>> {
        let endpoint = self.config.feedback_endpoint()?;
        let mut stream = self.open(&endpoint).await?;

        let records = read_feedback(&mut stream, self.config.io_timeout).await;
        self.close(stream).await;

        let records = records?;
        tracing::debug!("Received {} feedback record(s) from {}", records.len(), endpoint);
        Ok(records)
    }

    /// `Unconnected -> Handshaking -> Open`.
    async fn open(&mut self, endpoint: &Endpoint) -> Result<GatewayStream> {
        self.transition(SessionState::Handshaking);

        let credentials = Credentials::load(
            self.config.certificate.as_deref(),
            self.config.passphrase.as_deref(),
        )?;
        let tls_config =
            transport::client_config(credentials, self.config.ca_certificate.as_deref())?;

        tracing::debug!("Connecting to {}", endpoint);
        let tcp = transport::connect_tcp(endpoint, self.config.connect_timeout).await?;
        let stream =
            transport::handshake(tcp, endpoint, tls_config, self.config.io_timeout).await?;

        self.transition(SessionState::Open);
        Ok(stream)
    }

    /// `Open -> Closed`: close_notify, TCP shutdown, then drop the socket.
    async fn close(&mut self, mut stream: GatewayStream) -> bool {
        let clean = shutdown_stream(&mut stream, self.config.io_timeout).await;
        self.transition(SessionState::Closed);
        clean
    }

    fn begin(&self) -> Result<()> {
        if self.state != SessionState::Unconnected {
            return Err(ApnsError::SessionClosed);
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::trace!("Session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Write the whole batch and flush.
pub(crate) async fn write_stream<S>(
    stream: &mut S,
    bytes: &[u8],
    deadline: Option<Duration>,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    with_deadline(deadline, "write", async {
        stream.write_all(bytes).await?;
        stream.flush().await
    })
    .await??;
    Ok(())
}

/// Shut the stream down, reporting whether it closed cleanly.
pub(crate) async fn shutdown_stream<S>(stream: &mut S, deadline: Option<Duration>) -> bool
where
    S: AsyncWrite + Unpin,
{
    let result = with_deadline(deadline, "close", stream.shutdown())
        .await
        .and_then(|closed| closed.map_err(ApnsError::Io));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("TLS close failed: {}", e);
            false
        }
    }
}

/// Read feedback records until the peer closes the stream.
pub(crate) async fn read_feedback<S>(
    stream: &mut S,
    deadline: Option<Duration>,
) -> Result<Vec<FeedbackRecord>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = FeedbackBuffer::new();
    let mut records = Vec::new();
    let mut chunk = vec![0u8; FEEDBACK_READ_SIZE];

    loop {
        let n = match with_deadline(deadline, "feedback read", stream.read(&mut chunk)).await? {
            Ok(0) => break,
            Ok(n) => n,
            // The feedback service may drop TCP without a TLS close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Feedback stream ended without close_notify");
                break;
            }
            Err(e) => return Err(ApnsError::Io(e)),
        };

        records.extend(buffer.push(&chunk[..n])?);
    }

    if !buffer.is_empty() {
        tracing::warn!("Discarding {} trailing feedback byte(s)", buffer.len());
        buffer.clear();
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::DeviceToken;
    use crate::protocol::encode_frame;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::duplex;

    /// Writer whose shutdown fails, or never completes.
    struct BrokenClose {
        hang: bool,
    }

    impl AsyncWrite for BrokenClose {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            if self.hang {
                Poll::Pending
            } else {
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "peer reset",
                )))
            }
        }
    }

    fn record_bytes(timestamp: u32, fill: u8) -> Vec<u8> {
        let mut bytes = timestamp.to_be_bytes().to_vec();
        bytes.extend_from_slice(&32u16.to_be_bytes());
        bytes.extend_from_slice(&[fill; 32]);
        bytes
    }

    fn unreachable_config() -> GatewayConfig {
        // Port 9 on loopback; tests below must fail before dialing it.
        GatewayConfig {
            gateway: Endpoint::new("127.0.0.1", 9),
            feedback: Some(Endpoint::new("127.0.0.1", 9)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_read_feedback_two_records_and_tail() {
        let (mut server, mut client) = duplex(1024);

        let mut data = record_bytes(1_609_459_200, 0x00);
        data.extend(record_bytes(1_609_459_201, 0xFF));
        data.extend_from_slice(&[1, 2, 3, 4, 5]);

        server.write_all(&data).await.unwrap();
        drop(server);

        let records = read_feedback(&mut client, None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, 1_609_459_200);
        assert_eq!(records[0].token_hex(), "00".repeat(32));
        assert_eq!(records[1].token_hex(), "ff".repeat(32));
    }

    #[tokio::test]
    async fn test_read_feedback_record_split_across_writes() {
        let (mut server, mut client) = duplex(1024);
        let data = record_bytes(77, 0xAB);

        let writer = tokio::spawn(async move {
            server.write_all(&data[..10]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.write_all(&data[10..]).await.unwrap();
        });

        let records = read_feedback(&mut client, None).await.unwrap();
        writer.await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 77);
    }

    #[tokio::test]
    async fn test_read_feedback_empty_stream() {
        let (server, mut client) = duplex(64);
        drop(server);

        let records = read_feedback(&mut client, None).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_read_feedback_deadline() {
        let (_server, mut client) = duplex(64);

        let result = read_feedback(&mut client, Some(Duration::from_millis(20))).await;
        assert!(matches!(
            result,
            Err(ApnsError::DeadlineElapsed("feedback read"))
        ));
    }

    #[tokio::test]
    async fn test_write_stream_writes_batch() {
        let (mut client, mut server) = duplex(4096);
        let batch = encode_batch([&b"one"[..], &b"two"[..]]).unwrap();

        write_stream(&mut client, &batch, None).await.unwrap();
        drop(client);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();

        let mut expected = encode_frame(b"one").unwrap().to_vec();
        expected.extend_from_slice(&encode_frame(b"two").unwrap());
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_shutdown_stream_clean() {
        let (mut client, _server) = duplex(64);
        assert!(shutdown_stream(&mut client, None).await);
    }

    #[tokio::test]
    async fn test_shutdown_stream_error_is_unclean() {
        let mut stream = BrokenClose { hang: false };
        assert!(!shutdown_stream(&mut stream, None).await);
    }

    #[tokio::test]
    async fn test_shutdown_stream_deadline_is_unclean() {
        let mut stream = BrokenClose { hang: true };
        assert!(!shutdown_stream(&mut stream, Some(Duration::from_millis(20))).await);
    }

    #[tokio::test]
    async fn test_send_without_certificate_is_configuration_error() {
        let mut session = GatewaySession::new(Arc::new(unreachable_config()));
        assert_eq!(session.state(), SessionState::Unconnected);

        let result = session.send_notifications(&[]).await;
        match result {
            Err(ApnsError::Configuration(msg)) => assert_eq!(msg, "credential path not set"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_send_with_missing_certificate_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            certificate: Some(dir.path().join("absent.pem")),
            ..unreachable_config()
        };
        let mut session = GatewaySession::new(Arc::new(config));

        let token = DeviceToken::from_bytes(vec![0u8; 32]);
        let result = session
            .send_notifications(&[Notification::new(token, &b"{}"[..])])
            .await;
        assert!(matches!(result, Err(ApnsError::CredentialNotFound(_))));
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let mut session = GatewaySession::new(Arc::new(unreachable_config()));

        assert!(session.fetch_feedback().await.is_err());
        assert!(matches!(
            session.fetch_feedback().await,
            Err(ApnsError::SessionClosed)
        ));
        assert!(matches!(
            session.send_notifications(&[]).await,
            Err(ApnsError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_feedback_host_not_derivable() {
        let config = GatewayConfig {
            gateway: Endpoint::new("localhost", 2195),
            ..Default::default()
        };
        let mut session = GatewaySession::new(Arc::new(config));

        assert!(matches!(
            session.fetch_feedback().await,
            Err(ApnsError::Configuration(_))
        ));
    }
}
