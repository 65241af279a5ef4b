//! Start/done log lines around every operation.

use crate::base::neterror::NetError;
use crate::ops::{Config, Connector, Context, HttpRequest, HttpResponse, HttpTransport};
use crate::ops::{Resolver, TlsHandshaker};
use crate::socket::BoxedSocket;
use crate::tls::{TlsConfig, TlsState};
use futures::future::BoxFuture;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Logger<T> {
    inner: T,
    prefix: Arc<str>,
}

impl<T> Logger<T> {
    pub fn new(inner: T) -> Self {
        Self::with_prefix(inner, "")
    }

    /// Every line carries `prefix` in its `prefix` field.
    pub fn with_prefix(inner: T, prefix: impl Into<Arc<str>>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

/// Wraps every slot of `config`.
pub fn wrap(config: Config, prefix: &str) -> Config {
    let prefix: Arc<str> = Arc::from(prefix);
    Config {
        resolver: Arc::new(Logger::with_prefix(config.resolver, prefix.clone())),
        connector: Arc::new(Logger::with_prefix(config.connector, prefix.clone())),
        tls_handshaker: Arc::new(Logger::with_prefix(config.tls_handshaker, prefix.clone())),
        http_transport: Arc::new(Logger::with_prefix(config.http_transport, prefix)),
    }
}

impl<T: Resolver> Resolver for Logger<T> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            let prefix = &*self.prefix;
            debug!(prefix, domain, "resolve");
            let start = Instant::now();
            let result = self.inner.lookup_host(ctx, domain).await;
            match &result {
                Ok(addrs) => {
                    debug!(prefix, domain, addrs = ?addrs, elapsed = ?start.elapsed(), "resolve done")
                }
                Err(e) => {
                    debug!(prefix, domain, error = %e, elapsed = ?start.elapsed(), "resolve done")
                }
            }
            result
        })
    }
}

impl<T: Connector> Connector for Logger<T> {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            let prefix = &*self.prefix;
            debug!(prefix, network, address, "dial");
            let start = Instant::now();
            let result = self.inner.dial(ctx, network, address).await;
            match &result {
                Ok(_) => debug!(prefix, network, address, elapsed = ?start.elapsed(), "dial done"),
                Err(e) => debug!(
                    prefix,
                    network,
                    address,
                    error = %e,
                    elapsed = ?start.elapsed(),
                    "dial done"
                ),
            }
            result
        })
    }
}

impl<T: TlsHandshaker> TlsHandshaker for Logger<T> {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        Box::pin(async move {
            let prefix = &*self.prefix;
            let sni = config.server_name.as_deref().unwrap_or_default();
            debug!(prefix, sni, alpn = ?config.alpn_protocols, "tls handshake");
            let start = Instant::now();
            let result = self.inner.handshake(ctx, conn, config).await;
            match &result {
                Ok((_, state)) => debug!(
                    prefix,
                    sni,
                    version = %state.version,
                    alpn = ?state.negotiated_protocol,
                    elapsed = ?start.elapsed(),
                    "tls handshake done"
                ),
                Err(e) => {
                    debug!(prefix, sni, error = %e, elapsed = ?start.elapsed(), "tls handshake done")
                }
            }
            result
        })
    }
}

impl<T: HttpTransport> HttpTransport for Logger<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        Box::pin(async move {
            let prefix = &*self.prefix;
            let method = req.method().clone();
            let uri = req.uri().clone();
            debug!(prefix, %method, %uri, "round trip");
            let start = Instant::now();
            let result = self.inner.round_trip(ctx, req).await;
            match &result {
                Ok(resp) => debug!(
                    prefix,
                    %method,
                    %uri,
                    status = resp.status().as_u16(),
                    elapsed = ?start.elapsed(),
                    "round trip done"
                ),
                Err(e) => debug!(
                    prefix,
                    %method,
                    %uri,
                    error = %e,
                    elapsed = ?start.elapsed(),
                    "round trip done"
                ),
            }
            result
        })
    }
}
