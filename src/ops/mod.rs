//! The capability set.
//!
//! Four operations underlie every measurement: resolving a host, dialing a
//! connection, performing a TLS handshake and performing an HTTP exchange.
//! Each has a trait here; [`Config`] bundles one implementation of each, and
//! a [`Context`] optionally binds a `Config` so that deeply nested callers
//! pick up a decorated set without changing their signatures.
//!
//! Implementations must be thread-safe. All methods take `&self` and
//! return boxed futures so the traits stay object-safe.

use crate::base::neterror::NetError;
use crate::socket::BoxedSocket;
use crate::tls::{TlsConfig, TlsState};
use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use hyper::body::Incoming;
use std::net::IpAddr;
use std::sync::Arc;

pub mod config;
pub mod context;
pub mod dial;

pub use config::Config;
pub use context::Context;
pub use dial::{
    dial_context, dial_tls_context, dial_tls_context_config, join_host_port, lookup_host,
    round_trip, split_host_port,
};

pub type HttpRequest = http::Request<Full<Bytes>>;
pub type HttpResponse = http::Response<Incoming>;

/// Hostname to addresses.
pub trait Resolver: Send + Sync {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>>;
}

/// Opens a connection to a literal `ip:port` address.
///
/// `network` is one of `tcp`, `tcp4`, `tcp6`, `udp`, `udp4`, `udp6`.
pub trait Connector: Send + Sync {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>>;
}

/// Upgrades a connection to TLS.
///
/// On failure the connection is dropped.
pub trait TlsHandshaker: Send + Sync {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>>;
}

/// Performs one HTTP request/response exchange.
pub trait HttpTransport: Send + Sync {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        (**self).lookup_host(ctx, domain)
    }
}

impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        (**self).dial(ctx, network, address)
    }
}

impl<H: TlsHandshaker + ?Sized> TlsHandshaker for Arc<H> {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        (**self).handshake(ctx, conn, config)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        (**self).round_trip(ctx, req)
    }
}
