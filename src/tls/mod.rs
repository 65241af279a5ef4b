//! TLS configuration and the BoringSSL handshaker.

pub mod config;
pub mod handshake;

pub use config::{alpn_wire, TlsConfig, TlsVersion};
pub use handshake::{SystemHandshaker, TlsState};
