//! Timestamped records of operation boundaries.

use crate::base::neterror::NetError;
use crate::ops::{Config, Connector, Context, HttpRequest, HttpResponse, HttpTransport};
use crate::ops::{Resolver, TlsHandshaker};
use crate::socket::BoxedSocket;
use crate::tls::{TlsConfig, TlsState};
use futures::future::BoxFuture;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

pub const LOOKUP_HOST_START: &str = "LookupHostStart";
pub const LOOKUP_HOST_DONE: &str = "LookupHostDone";
pub const DIAL_START: &str = "DialStart";
pub const DIAL_DONE: &str = "DialDone";
pub const TLS_HANDSHAKE_START: &str = "TlsHandshakeStart";
pub const TLS_HANDSHAKE_DONE: &str = "TlsHandshakeDone";
pub const ROUND_TRIP_START: &str = "RoundTripStart";
pub const ROUND_TRIP_DONE: &str = "RoundTripDone";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub op: &'static str,
    pub time: OffsetDateTime,
}

/// Append-only list of events shared by every slot of a saving config.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn emit(&self, op: &'static str) {
        let event = Event {
            op,
            time: OffsetDateTime::now_utc(),
        };
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    /// Returns the events recorded so far and clears the log.
    pub fn read_events(&self) -> Vec<Event> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Saver<T> {
    inner: T,
    log: Arc<EventLog>,
}

impl<T> Saver<T> {
    pub fn new(inner: T, log: Arc<EventLog>) -> Self {
        Self { inner, log }
    }

    /// Drains the shared event log.
    pub fn read_events(&self) -> Vec<Event> {
        self.log.read_events()
    }
}

/// Wraps every slot of `config`; all four record into `log`.
pub fn wrap(config: Config, log: &Arc<EventLog>) -> Config {
    Config {
        resolver: Arc::new(Saver::new(config.resolver, log.clone())),
        connector: Arc::new(Saver::new(config.connector, log.clone())),
        tls_handshaker: Arc::new(Saver::new(config.tls_handshaker, log.clone())),
        http_transport: Arc::new(Saver::new(config.http_transport, log.clone())),
    }
}

impl<T: Resolver> Resolver for Saver<T> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            self.log.emit(LOOKUP_HOST_START);
            let result = self.inner.lookup_host(ctx, domain).await;
            self.log.emit(LOOKUP_HOST_DONE);
            result
        })
    }
}

impl<T: Connector> Connector for Saver<T> {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            self.log.emit(DIAL_START);
            let result = self.inner.dial(ctx, network, address).await;
            self.log.emit(DIAL_DONE);
            result
        })
    }
}

impl<T: TlsHandshaker> TlsHandshaker for Saver<T> {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        Box::pin(async move {
            self.log.emit(TLS_HANDSHAKE_START);
            let result = self.inner.handshake(ctx, conn, config).await;
            self.log.emit(TLS_HANDSHAKE_DONE);
            result
        })
    }
}

impl<T: HttpTransport> HttpTransport for Saver<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        Box::pin(async move {
            self.log.emit(ROUND_TRIP_START);
            let result = self.inner.round_trip(ctx, req).await;
            self.log.emit(ROUND_TRIP_DONE);
            result
        })
    }
}
