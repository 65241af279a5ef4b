//! Failure taxonomy.
//!
//! Every error that crosses an error-wrapping decorator is reduced to one of
//! a small set of stable strings. Experiments store these strings in their
//! reports, so they must never change.

use crate::base::neterror::{DnsError, NetError};
use boring::x509::X509VerifyError;
use std::{error::Error as _, fmt, io, net::IpAddr, net::SocketAddr};

pub const CONNECTION_REFUSED: &str = "connection_refused";
pub const CONNECTION_RESET: &str = "connection_reset";
pub const DNS_BOGON_ERROR: &str = "dns_bogon_error";
pub const DNS_NXDOMAIN_ERROR: &str = "dns_nxdomain_error";
pub const EOF_ERROR: &str = "eof_error";
pub const GENERIC_TIMEOUT_ERROR: &str = "generic_timeout_error";
pub const INTERRUPTED: &str = "interrupted";
pub const SSL_INVALID_HOSTNAME: &str = "ssl_invalid_hostname";
pub const SSL_UNKNOWN_AUTHORITY: &str = "ssl_unknown_authority";
pub const SSL_INVALID_CERTIFICATE: &str = "ssl_invalid_certificate";
pub const UNKNOWN_FAILURE_PREFIX: &str = "unknown_failure: ";

const SCRUBBED: &str = "[scrubbed]";

/// The major operation an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Resolve,
    Connect,
    TlsHandshake,
    HttpRoundTrip,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Resolve => "resolve",
            Operation::Connect => "connect",
            Operation::TlsHandshake => "tls_handshake",
            Operation::HttpRoundTrip => "http_round_trip",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Failure {
    ConnectionRefused,
    ConnectionReset,
    DnsBogon,
    DnsNxdomain,
    Eof,
    GenericTimeout,
    Interrupted,
    SslInvalidHostname,
    SslUnknownAuthority,
    SslInvalidCertificate,
    /// Anything else; holds the scrubbed error message.
    Unknown(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Failure::ConnectionRefused => CONNECTION_REFUSED,
            Failure::ConnectionReset => CONNECTION_RESET,
            Failure::DnsBogon => DNS_BOGON_ERROR,
            Failure::DnsNxdomain => DNS_NXDOMAIN_ERROR,
            Failure::Eof => EOF_ERROR,
            Failure::GenericTimeout => GENERIC_TIMEOUT_ERROR,
            Failure::Interrupted => INTERRUPTED,
            Failure::SslInvalidHostname => SSL_INVALID_HOSTNAME,
            Failure::SslUnknownAuthority => SSL_UNKNOWN_AUTHORITY,
            Failure::SslInvalidCertificate => SSL_INVALID_CERTIFICATE,
            Failure::Unknown(msg) => return write!(f, "{UNKNOWN_FAILURE_PREFIX}{msg}"),
        };
        f.write_str(s)
    }
}

/// Maps an error to its failure class.
///
/// An already-classified error keeps its failure. A connection aggregate is
/// classified by its first inner error.
pub fn classify(err: &NetError) -> Failure {
    match err {
        NetError::Wrapped(w) => w.failure.clone(),
        NetError::Connect(c) => match c.errors.first() {
            Some(first) => classify(first),
            None => unknown(err),
        },
        NetError::DeadlineExceeded => Failure::GenericTimeout,
        NetError::Canceled => Failure::Interrupted,
        NetError::Dns(DnsError::NoSuchHost) => Failure::DnsNxdomain,
        NetError::Dns(DnsError::Bogon) => Failure::DnsBogon,
        NetError::Io(e) => classify_io(e).unwrap_or_else(|| unknown(err)),
        NetError::CertVerify(verify) => classify_cert(*verify),
        NetError::Http(e) => {
            if e.is_timeout() {
                return Failure::GenericTimeout;
            }
            if e.is_canceled() {
                return Failure::Interrupted;
            }
            let mut source = e.source();
            while let Some(cause) = source {
                if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                    if let Some(failure) = classify_io(io_err) {
                        return failure;
                    }
                }
                source = cause.source();
            }
            if e.is_incomplete_message() {
                return Failure::Eof;
            }
            unknown(err)
        }
        _ => unknown(err),
    }
}

fn unknown(err: &NetError) -> Failure {
    Failure::Unknown(scrub(&err.to_string()))
}

fn classify_io(e: &io::Error) -> Option<Failure> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => return Some(Failure::ConnectionRefused),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
            return Some(Failure::ConnectionReset)
        }
        io::ErrorKind::UnexpectedEof => return Some(Failure::Eof),
        io::ErrorKind::TimedOut => return Some(Failure::GenericTimeout),
        io::ErrorKind::Interrupted => return Some(Failure::Interrupted),
        _ => {}
    }
    classify_message(&e.to_string())
}

const NAME_MISMATCH: [X509VerifyError; 2] = [
    X509VerifyError::HOSTNAME_MISMATCH,
    X509VerifyError::IP_ADDRESS_MISMATCH,
];

const UNKNOWN_ISSUER: [X509VerifyError; 6] = [
    X509VerifyError::DEPTH_ZERO_SELF_SIGNED_CERT,
    X509VerifyError::SELF_SIGNED_CERT_IN_CHAIN,
    X509VerifyError::UNABLE_TO_GET_ISSUER_CERT,
    X509VerifyError::UNABLE_TO_GET_ISSUER_CERT_LOCALLY,
    X509VerifyError::UNABLE_TO_VERIFY_LEAF_SIGNATURE,
    X509VerifyError::CERT_UNTRUSTED,
];

/// Any other verification error (expired, not yet valid, bad purpose...)
/// is an invalid certificate.
fn classify_cert(verify: X509VerifyError) -> Failure {
    if NAME_MISMATCH.contains(&verify) {
        Failure::SslInvalidHostname
    } else if UNKNOWN_ISSUER.contains(&verify) {
        Failure::SslUnknownAuthority
    } else {
        Failure::SslInvalidCertificate
    }
}

fn classify_message(msg: &str) -> Option<Failure> {
    let lower = msg.to_ascii_lowercase();
    if lower.ends_with("eof") || lower.contains("unexpected eof") {
        Some(Failure::Eof)
    } else if lower.contains("connection refused") {
        Some(Failure::ConnectionRefused)
    } else if lower.contains("connection reset") {
        Some(Failure::ConnectionReset)
    } else if lower.contains("timed out") || lower.contains("i/o timeout") {
        Some(Failure::GenericTimeout)
    } else {
        None
    }
}

/// Returns the failure string of an error.
///
/// `None` yields the empty string; a classified error yields its failure;
/// any other error yields `unknown_failure: ` followed by its message.
pub fn failure(err: Option<&NetError>) -> String {
    match err {
        None => String::new(),
        Some(NetError::Wrapped(w)) => w.failure.to_string(),
        Some(other) => format!("{UNKNOWN_FAILURE_PREFIX}{other}"),
    }
}

/// Returns the operation string of a classified error, or the empty string.
pub fn operation(err: Option<&NetError>) -> String {
    match err {
        Some(NetError::Wrapped(w)) => w.operation.as_str().to_owned(),
        _ => String::new(),
    }
}

/// Replaces IP address literals (with or without a port) by `[scrubbed]`.
pub fn scrub(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while !rest.is_empty() {
        let start = match rest.find(is_address_char) {
            Some(i) => i,
            None => {
                out.push_str(rest);
                break;
            }
        };
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(|c| !is_address_char(c)).unwrap_or(rest.len());
        let token = &rest[..end];
        let trimmed = token.trim_end_matches(['.', ':']);
        if is_address(trimmed) {
            out.push_str(SCRUBBED);
            out.push_str(&token[trimmed.len()..]);
        } else {
            out.push_str(token);
        }
        rest = &rest[end..];
    }
    out
}

fn is_address_char(c: char) -> bool {
    c.is_ascii_hexdigit() || matches!(c, '.' | ':' | '[' | ']' | '%')
}

fn is_address(token: &str) -> bool {
    if !token.bytes().any(|b| b.is_ascii_digit()) {
        return false;
    }
    token.parse::<IpAddr>().is_ok() || token.parse::<SocketAddr>().is_ok()
}
