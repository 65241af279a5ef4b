//! # probenet
//!
//! Network operations for censorship measurement.
//!
//! `probenet` exposes networking as four replaceable capabilities (host
//! lookup, dial, TLS handshake, HTTP round trip) gathered in a
//! [`ops::Config`]. Decorators stack on top to count bytes, classify
//! errors, log and record events, and a from-scratch DNS client resolves
//! over UDP, TCP, DNS-over-TLS or DNS-over-HTTPS.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use probenet::ops::{dial_tls_context, Context};
//! use probenet::options::Options;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Options::from_json(r#"{"dns": {"network": "dot", "address": "1.1.1.1"}}"#)
//!         .unwrap()
//!         .build()
//!         .unwrap();
//!     let ctx = Context::background().with_config(session.config.clone());
//!     let (_conn, state) = dial_tls_context(&ctx, "tcp", "example.com:443").await.unwrap();
//!     println!("{} {:?}", state.version, state.negotiated_protocol);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ops`] - Capability traits, per-call context and composite dialing
//! - [`dns`] - System and wire-format resolvers, DNS transports
//! - [`socket`] - Stream sockets and the TCP/UDP connector
//! - [`tls`] - BoringSSL handshakes
//! - [`http`] - HTTP/1.1 and HTTP/2 round trips
//! - [`decorator`] - Byte counting, error wrapping, logging, event saving
//! - [`base`] - Error types and failure classification
//! - [`options`] - JSON-loadable session setup

pub mod base;
pub mod decorator;
pub mod dns;
pub mod http;
pub mod ops;
pub mod options;
pub mod socket;
pub mod tls;

pub use base::neterror::NetError;
pub use ops::{Config, Context};
