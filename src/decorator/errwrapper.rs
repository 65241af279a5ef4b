//! Error classification.
//!
//! Errors leaving a wrapped operation become [`NetError::Wrapped`], tagged
//! with the operation and the failure class. Successes pass through.

use crate::base::failure::{classify, Operation};
use crate::base::neterror::{NetError, WrappedError};
use crate::ops::{Config, Connector, Context, HttpRequest, HttpResponse, HttpTransport};
use crate::ops::{Resolver, TlsHandshaker};
use crate::socket::BoxedSocket;
use crate::tls::{TlsConfig, TlsState};
use futures::future::BoxFuture;
use std::net::IpAddr;
use std::sync::Arc;

/// Classifies `err` as a failure of `operation`.
///
/// An error that is already classified is returned unchanged, so nested
/// wrappers keep the innermost (most specific) operation.
pub fn wrap_error(operation: Operation, err: NetError) -> NetError {
    if err.as_wrapped().is_some() {
        return err;
    }
    NetError::Wrapped(WrappedError {
        operation,
        failure: classify(&err),
        source: Box::new(err),
    })
}

#[derive(Debug, Clone)]
pub struct ErrWrapper<T> {
    inner: T,
}

impl<T> ErrWrapper<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

/// Wraps every slot of `config`.
pub fn wrap(config: Config) -> Config {
    Config {
        resolver: Arc::new(ErrWrapper::new(config.resolver)),
        connector: Arc::new(ErrWrapper::new(config.connector)),
        tls_handshaker: Arc::new(ErrWrapper::new(config.tls_handshaker)),
        http_transport: Arc::new(ErrWrapper::new(config.http_transport)),
    }
}

impl<T: Resolver> Resolver for ErrWrapper<T> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            self.inner
                .lookup_host(ctx, domain)
                .await
                .map_err(|e| wrap_error(Operation::Resolve, e))
        })
    }
}

impl<T: Connector> Connector for ErrWrapper<T> {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            self.inner
                .dial(ctx, network, address)
                .await
                .map_err(|e| wrap_error(Operation::Connect, e))
        })
    }
}

impl<T: TlsHandshaker> TlsHandshaker for ErrWrapper<T> {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        Box::pin(async move {
            self.inner
                .handshake(ctx, conn, config)
                .await
                .map_err(|e| wrap_error(Operation::TlsHandshake, e))
        })
    }
}

impl<T: HttpTransport> HttpTransport for ErrWrapper<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        Box::pin(async move {
            self.inner.round_trip(ctx, req).await.map_err(|e| {
                // no address, or every address failed: this is a connect
                // failure, not an exchange failure
                let operation = if matches!(e, NetError::Connect(_) | NetError::NoAddresses) {
                    Operation::Connect
                } else {
                    Operation::HttpRoundTrip
                };
                wrap_error(operation, e)
            })
        })
    }
}
