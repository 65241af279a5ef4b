//! DNS over UDP (RFC 1035 §4.2.1).

use crate::base::neterror::NetError;
use crate::dns::transport::{dial_context_for, DnsTransport};
use crate::ops::{dial_context, Config, Context};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const DEFAULT_UDP_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DATAGRAM_SIZE: usize = 1 << 17;

/// Sends each query on a fresh UDP association.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    address: String,
    config: Option<Arc<Config>>,
    timeout: Duration,
}

impl UdpTransport {
    /// `address` is `host:port`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            config: None,
            timeout: DEFAULT_UDP_TIMEOUT,
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
}

impl DnsTransport for UdpTransport {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        query: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, NetError>> {
        Box::pin(async move {
            let ctx = dial_context_for(ctx, self.config.as_ref());
            let exchange = async {
                let mut conn = dial_context(&ctx, "udp", &self.address).await?;
                conn.write_all(query).await?;
                let mut reply = vec![0u8; MAX_DATAGRAM_SIZE];
                let n = conn.read(&mut reply).await?;
                reply.truncate(n);
                Ok::<_, NetError>(reply)
            };
            ctx.run_with_timeout(self.timeout, exchange).await
        })
    }

    fn requires_padding(&self) -> bool {
        false
    }

    fn network(&self) -> &'static str {
        "udp"
    }

    fn address(&self) -> &str {
        &self.address
    }
}
