//! The default [`TlsHandshaker`], built on BoringSSL.

use crate::base::neterror::NetError;
use crate::ops::{Context, TlsHandshaker};
use crate::socket::BoxedSocket;
use crate::tls::TlsConfig;
use boring::ssl::{ErrorCode, SslConnector, SslMethod, SslRef};
use boring::x509::X509VerifyError;
use futures::future::BoxFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

/// Handshake timeout applied on top of the caller's deadline.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a completed handshake negotiated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsState {
    pub version: String,
    pub cipher_suite: Option<String>,
    pub negotiated_protocol: Option<String>,
    /// DER-encoded peer chain, leaf first.
    pub peer_certificates: Vec<Vec<u8>>,
}

impl TlsState {
    fn from_ssl(ssl: &SslRef) -> Self {
        let peer_certificates = ssl
            .peer_cert_chain()
            .map(|chain| chain.iter().filter_map(|cert| cert.to_der().ok()).collect())
            .unwrap_or_default();
        Self {
            version: ssl.version_str().to_owned(),
            cipher_suite: ssl.current_cipher().map(|c| c.name().to_owned()),
            negotiated_protocol: ssl
                .selected_alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            peer_certificates,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemHandshaker {
    timeout: Duration,
}

impl Default for SystemHandshaker {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemHandshaker {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TlsHandshaker for SystemHandshaker {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        Box::pin(async move {
            let server_name = config.server_name.clone().unwrap_or_default();
            if server_name.is_empty() && !config.insecure_skip_verify {
                return Err(NetError::Config(
                    "tls: either server_name or insecure_skip_verify must be set".into(),
                ));
            }

            let mut builder = SslConnector::builder(SslMethod::tls()).map_err(tls_error)?;
            config.apply_to_builder(&mut builder)?;
            let connector = builder.build();
            let mut configuration = connector.configure().map_err(tls_error)?;
            if !TlsConfig::should_set_sni(&server_name) {
                configuration.set_use_server_name_indication(false);
            }
            if config.insecure_skip_verify {
                configuration.set_verify_hostname(false);
            }

            // The handshake runs on its own task and reports through a
            // one-slot channel. If we stop waiting, the task is aborted; a
            // result that lands first is dropped with the channel.
            let (tx, rx) = oneshot::channel();
            let task = tokio::spawn(async move {
                let result = tokio_boring::connect(configuration, &server_name, conn).await;
                let _ = tx.send(result);
            });

            let mut deadline = Instant::now() + self.timeout;
            if let Some(ctx_deadline) = ctx.deadline() {
                deadline = deadline.min(ctx_deadline);
            }

            let started = Instant::now();
            match tokio::time::timeout_at(deadline, rx).await {
                Err(_) => {
                    task.abort();
                    debug!(elapsed = ?started.elapsed(), "tls handshake timed out");
                    Err(NetError::DeadlineExceeded)
                }
                Ok(Err(_)) => Err(NetError::Canceled),
                Ok(Ok(Err(e))) => {
                    debug!(error = %e, "tls handshake failed");
                    Err(handshake_error(&e, config.insecure_skip_verify))
                }
                Ok(Ok(Ok(stream))) => {
                    let state = TlsState::from_ssl(stream.ssl());
                    debug!(
                        version = %state.version,
                        alpn = ?state.negotiated_protocol,
                        elapsed = ?started.elapsed(),
                        "tls handshake done"
                    );
                    Ok((BoxedSocket::new(stream), state))
                }
            }
        })
    }
}

fn handshake_error<S>(e: &tokio_boring::HandshakeError<S>, skip_verify: bool) -> NetError {
    if let Some(io) = e.as_io_error() {
        return NetError::Io(Arc::new(io::Error::new(io.kind(), io.to_string())));
    }
    if !skip_verify && e.code() == Some(ErrorCode::SSL) {
        // INVALID_CALL: the handshake failed before the peer chain was checked
        if let Some(Err(verify)) = e.ssl().map(|ssl| ssl.verify_result()) {
            if verify != X509VerifyError::INVALID_CALL {
                return NetError::CertVerify(verify);
            }
        }
    }
    NetError::Tls(e.to_string())
}

fn tls_error(e: boring::error::ErrorStack) -> NetError {
    NetError::Tls(e.to_string())
}
