//! DNS over TCP (RFC 1035 §4.2.2) and DNS over TLS (RFC 7858).
//!
//! Both frame each message with a two-byte big-endian length.

use crate::base::neterror::{DnsError, NetError};
use crate::dns::transport::{dial_context_for, DnsTransport};
use crate::ops::{dial_context, dial_tls_context_config, Config, Context};
use crate::socket::BoxedSocket;
use crate::tls::TlsConfig;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
enum Security {
    Plain,
    Tls(TlsConfig),
}

/// A stream transport: plain TCP or TLS.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    address: String,
    security: Security,
    config: Option<Arc<Config>>,
    timeout: Duration,
}

impl TcpTransport {
    /// DNS over TCP to `host:port`.
    pub fn tcp(address: impl Into<String>) -> Self {
        Self::with_security(address.into(), Security::Plain)
    }

    /// DNS over TLS to `host:port`. No ALPN is offered.
    pub fn tls(address: impl Into<String>) -> Self {
        Self::with_security(
            address.into(),
            Security::Tls(TlsConfig::new().with_alpn(Vec::<String>::new())),
        )
    }

    fn with_security(address: String, security: Security) -> Self {
        Self {
            address,
            security,
            config: None,
            timeout: DEFAULT_TCP_TIMEOUT,
        }
    }

    /// Capability set used to dial the server.
    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// TLS template for DoT, e.g. to force an SNI or trust a private CA.
    /// ALPN stays off unless the template sets it. Has no effect on plain
    /// TCP transports.
    pub fn with_tls_config(mut self, mut tls: TlsConfig) -> Self {
        if let Security::Tls(current) = &mut self.security {
            if tls.alpn_protocols.is_none() {
                tls.alpn_protocols = Some(Vec::new());
            }
            *current = tls;
        }
        self
    }

    async fn connect(&self, ctx: &Context) -> Result<BoxedSocket, NetError> {
        match &self.security {
            Security::Plain => dial_context(ctx, "tcp", &self.address).await,
            Security::Tls(tls) => {
                let (conn, _) = dial_tls_context_config(ctx, "tcp", &self.address, tls).await?;
                Ok(conn)
            }
        }
    }
}

/// Writes `query` with its length prefix, then reads one framed reply.
pub async fn exchange_framed<S>(conn: &mut S, query: &[u8]) -> Result<Vec<u8>, NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let len = u16::try_from(query.len()).map_err(|_| DnsError::QueryTooLarge(query.len()))?;
    let mut frame = Vec::with_capacity(query.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(query);
    conn.write_all(&frame).await?;
    conn.flush().await?;

    let reply_len = conn.read_u16().await? as usize;
    let mut reply = vec![0u8; reply_len];
    conn.read_exact(&mut reply).await?;
    Ok(reply)
}

impl DnsTransport for TcpTransport {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        query: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, NetError>> {
        Box::pin(async move {
            if query.len() > usize::from(u16::MAX) {
                return Err(DnsError::QueryTooLarge(query.len()).into());
            }
            let ctx = dial_context_for(ctx, self.config.as_ref());
            let exchange = async {
                let mut conn = self.connect(&ctx).await?;
                exchange_framed(&mut conn, query).await
            };
            ctx.run_with_timeout(self.timeout, exchange).await
        })
    }

    fn requires_padding(&self) -> bool {
        matches!(self.security, Security::Tls(_))
    }

    fn network(&self) -> &'static str {
        match self.security {
            Security::Plain => "tcp",
            Security::Tls(_) => "dot",
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}
