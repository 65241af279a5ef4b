//! Byte accounting for connections.

use crate::base::neterror::NetError;
use crate::ops::{Config, Connector, Context, HttpRequest, HttpResponse, HttpTransport};
use crate::ops::{Resolver, TlsHandshaker};
use crate::socket::{BoxedSocket, StreamSocket};
use crate::tls::{TlsConfig, TlsState};
use futures::future::BoxFuture;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Bytes sent and received.
#[derive(Debug, Default)]
pub struct Counter {
    sent: AtomicU64,
    received: AtomicU64,
}

impl Counter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count_sent(&self, n: usize) {
        self.sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn count_received(&self, n: usize) {
        self.received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn kibibytes_sent(&self) -> f64 {
        self.bytes_sent() as f64 / 1024.0
    }

    pub fn kibibytes_received(&self) -> f64 {
        self.bytes_received() as f64 / 1024.0
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent {:.1} KiB, received {:.1} KiB",
            self.kibibytes_sent(),
            self.kibibytes_received()
        )
    }
}

/// The session counter and, optionally, the current experiment's.
#[derive(Debug, Clone)]
struct Counters {
    session: Arc<Counter>,
    experiment: Option<Arc<Counter>>,
}

impl Counters {
    fn sent(&self, n: usize) {
        self.session.count_sent(n);
        if let Some(experiment) = &self.experiment {
            experiment.count_sent(n);
        }
    }

    fn received(&self, n: usize) {
        self.session.count_received(n);
        if let Some(experiment) = &self.experiment {
            experiment.count_received(n);
        }
    }
}

/// A connection whose traffic is added to counters.
pub struct CountingSocket {
    inner: BoxedSocket,
    counters: Counters,
}

impl StreamSocket for CountingSocket {
    fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr()
    }
}

impl AsyncRead for CountingSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            self.counters.received(buf.filled().len() - before);
        }
        poll
    }
}

impl AsyncWrite for CountingSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.counters.sent(n);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Counts the bytes of every connection opened by `dial`.
///
/// Handshakes run over connections that are already counted, so their
/// results are passed through unchanged.
#[derive(Clone)]
pub struct ByteCounter<T> {
    inner: T,
    counters: Counters,
}

impl<T> ByteCounter<T> {
    pub fn new(inner: T, session: Arc<Counter>, experiment: Option<Arc<Counter>>) -> Self {
        Self {
            inner,
            counters: Counters {
                session,
                experiment,
            },
        }
    }
}

/// Wraps every slot of `config`.
pub fn wrap(config: Config, session: Arc<Counter>, experiment: Option<Arc<Counter>>) -> Config {
    let counters = Counters {
        session,
        experiment,
    };
    Config {
        resolver: Arc::new(ByteCounter {
            inner: config.resolver,
            counters: counters.clone(),
        }),
        connector: Arc::new(ByteCounter {
            inner: config.connector,
            counters: counters.clone(),
        }),
        tls_handshaker: Arc::new(ByteCounter {
            inner: config.tls_handshaker,
            counters: counters.clone(),
        }),
        http_transport: Arc::new(ByteCounter {
            inner: config.http_transport,
            counters,
        }),
    }
}

impl<T: Resolver> Resolver for ByteCounter<T> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        self.inner.lookup_host(ctx, domain)
    }
}

impl<T: Connector> Connector for ByteCounter<T> {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            let conn = self.inner.dial(ctx, network, address).await?;
            Ok(BoxedSocket::new(CountingSocket {
                inner: conn,
                counters: self.counters.clone(),
            }))
        })
    }
}

impl<T: TlsHandshaker> TlsHandshaker for ByteCounter<T> {
    fn handshake<'a>(
        &'a self,
        ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        self.inner.handshake(ctx, conn, config)
    }
}

impl<T: HttpTransport> HttpTransport for ByteCounter<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        self.inner.round_trip(ctx, req)
    }
}
