//! The default [`Connector`]: the operating system's socket stack.

use crate::base::neterror::NetError;
use crate::ops::{Connector, Context};
use crate::socket::{BoxedSocket, UdpConn};
use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Connect timeout applied on top of the caller's deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Any,
    V4,
    V6,
}

fn parse_network(network: &str) -> Result<(Transport, Family), NetError> {
    Ok(match network {
        "tcp" => (Transport::Tcp, Family::Any),
        "tcp4" => (Transport::Tcp, Family::V4),
        "tcp6" => (Transport::Tcp, Family::V6),
        "udp" => (Transport::Udp, Family::Any),
        "udp4" => (Transport::Udp, Family::V4),
        "udp6" => (Transport::Udp, Family::V6),
        other => return Err(NetError::UnsupportedNetwork(other.to_owned())),
    })
}

/// Dials literal `ip:port` addresses over TCP or UDP.
///
/// Hostnames are rejected; [`dial_context`] resolves them through the
/// context's [`Resolver`] first.
///
/// [`Resolver`]: crate::ops::Resolver
/// [`dial_context`]: crate::ops::dial_context
#[derive(Debug, Clone)]
pub struct SystemConnector {
    timeout: Duration,
}

impl Default for SystemConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemConnector {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Connector for SystemConnector {
    fn dial<'a>(
        &'a self,
        ctx: &'a Context,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            let (transport, family) = parse_network(network)?;
            let addr: SocketAddr = address
                .parse()
                .map_err(|_| NetError::InvalidAddress(address.to_owned()))?;
            let family_ok = match family {
                Family::Any => true,
                Family::V4 => addr.is_ipv4(),
                Family::V6 => addr.is_ipv6(),
            };
            if !family_ok {
                return Err(NetError::InvalidAddress(format!("{address} for {network}")));
            }

            tracing::debug!(network, address, "dialing");
            ctx.run_with_timeout(self.timeout, async move {
                match transport {
                    Transport::Tcp => TcpStream::connect(addr)
                        .await
                        .map(BoxedSocket::new)
                        .map_err(NetError::from),
                    Transport::Udp => UdpConn::connect(addr).await.map(BoxedSocket::new),
                }
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_tcp_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"hi").await.unwrap();
        });

        let ctx = Context::background();
        let mut conn = SystemConnector::new().dial(&ctx, "tcp", &addr).await.unwrap();
        let mut buf = [0u8; 2];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dial_rejects_hostnames_and_bad_networks() {
        let ctx = Context::background();
        let connector = SystemConnector::new();
        assert!(matches!(
            connector.dial(&ctx, "tcp", "example.com:80").await,
            Err(NetError::InvalidAddress(_))
        ));
        assert!(matches!(
            connector.dial(&ctx, "sctp", "127.0.0.1:80").await,
            Err(NetError::UnsupportedNetwork(_))
        ));
        assert!(matches!(
            connector.dial(&ctx, "tcp6", "127.0.0.1:80").await,
            Err(NetError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let ctx = Context::background();
        let err = SystemConnector::new().dial(&ctx, "tcp", &addr).await.unwrap_err();
        match err {
            NetError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionRefused),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
