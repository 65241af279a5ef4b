use crate::base::failure::{Failure, Operation};
use boring::x509::X509VerifyError;
use std::{fmt, io, sync::Arc};
use thiserror::Error;

/// Every error produced by the network-operations layer.
///
/// Foreign error sources are kept behind `Arc` so the whole enum stays
/// `Clone`; the aggregate and wrapped variants need to hold copies of
/// inner errors.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Socket-level errors
    #[error(transparent)]
    Io(Arc<io::Error>),
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("operation was canceled")]
    Canceled,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("the resolver returned no addresses")]
    NoAddresses,

    // Protocol errors
    #[error(transparent)]
    Dns(#[from] DnsError),
    #[error("{0}")]
    Tls(String),
    /// The peer's certificate failed verification.
    #[error("ssl: certificate verify failed: {0}")]
    CertVerify(X509VerifyError),
    #[error(transparent)]
    Http(Arc<hyper::Error>),
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Composite errors
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Wrapped(WrappedError),

    #[error("config: {0}")]
    Config(String),
}

impl NetError {
    /// Builds an I/O error of the given kind.
    pub fn io(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        NetError::Io(Arc::new(io::Error::new(kind, message.into())))
    }

    /// Returns true if this error was caused by some timer expiring.
    ///
    /// The DNS resolver retries only this class of errors.
    pub fn is_timeout(&self) -> bool {
        match self {
            NetError::DeadlineExceeded => true,
            NetError::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            NetError::Http(e) => e.is_timeout(),
            NetError::Wrapped(w) => w.failure == Failure::GenericTimeout,
            _ => false,
        }
    }

    /// Returns the classified wrapper, if this error was classified.
    pub fn as_wrapped(&self) -> Option<&WrappedError> {
        match self {
            NetError::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    /// Finds the connection-aggregate error, looking through one level of
    /// classification.
    pub fn as_connect_error(&self) -> Option<&ConnectError> {
        match self {
            NetError::Connect(c) => Some(c),
            NetError::Wrapped(w) => w.source.as_connect_error(),
            _ => None,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(Arc::new(e))
    }
}

impl From<hyper::Error> for NetError {
    fn from(e: hyper::Error) -> Self {
        NetError::Http(Arc::new(e))
    }
}

impl From<http::Error> for NetError {
    fn from(e: http::Error) -> Self {
        NetError::InvalidRequest(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for NetError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        NetError::DeadlineExceeded
    }
}

/// Errors produced while building, exchanging or interpreting DNS messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("dnsclient: no such host")]
    NoSuchHost,
    #[error("dnsclient: query failed")]
    QueryFailed { rcode: u16 },
    #[error("dnsclient: no response returned")]
    NoResponse,
    #[error("dnsclient: transaction id mismatch (sent {sent}, received {received})")]
    IdMismatch { sent: u16, received: u16 },
    #[error("dnsclient: invalid name {0:?}")]
    InvalidName(String),
    #[error("dnsclient: malformed reply: {0}")]
    Malformed(String),
    #[error("dnsclient: query too large ({0} bytes)")]
    QueryTooLarge(usize),
    #[error("dnsclient: reply contains bogon addresses")]
    Bogon,
    #[error("doh: server returned error")]
    DohStatus(u16),
    #[error("doh: invalid content-type")]
    DohContentType,
}

/// Collects one error per address attempted by `dial_context` when every
/// address failed. The errors are in resolution order.
#[derive(Debug, Clone)]
pub struct ConnectError {
    pub errors: Vec<NetError>,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connect_error")
    }
}

impl std::error::Error for ConnectError {}

/// An error tagged with the operation that failed and its failure string.
///
/// The wrapped error displays as its failure string. The original error
/// stays reachable through [`std::error::Error::source`].
#[derive(Debug, Clone)]
pub struct WrappedError {
    pub operation: Operation,
    pub failure: Failure,
    pub source: Box<NetError>,
}

impl fmt::Display for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.failure, f)
    }
}

impl std::error::Error for WrappedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
