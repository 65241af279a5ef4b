//! System DNS resolver using getaddrinfo.
//!
//! Resolution runs in `tokio::task::spawn_blocking` so it does not block
//! the async runtime. This is the default [`Resolver`].

use crate::base::neterror::{DnsError, NetError};
use crate::ops::{Context, Resolver};
use futures::future::BoxFuture;
use std::net::{IpAddr, ToSocketAddrs};

// getaddrinfo error texts for a name that does not exist, per platform.
const NXDOMAIN_MESSAGES: [&str; 4] = [
    "name or service not known",
    "nodename nor servname provided",
    "no such host is known",
    "no address associated with hostname",
];

#[derive(Clone, Debug, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

fn is_nxdomain(e: &std::io::Error) -> bool {
    let msg = e.to_string().to_ascii_lowercase();
    NXDOMAIN_MESSAGES.iter().any(|m| msg.contains(m))
}

impl Resolver for SystemResolver {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            if let Ok(ip) = domain.parse::<IpAddr>() {
                return Ok(vec![ip]);
            }

            let host = domain.trim_end_matches('.').to_owned();
            let lookup = async {
                tokio::task::spawn_blocking(move || {
                    tracing::debug!(host = %host, "resolving via getaddrinfo");
                    (host.as_str(), 0u16)
                        .to_socket_addrs()
                        .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<_>>())
                })
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    NetError::Canceled
                })
            };

            let addrs = ctx.run(lookup).await?.map_err(|e| {
                tracing::debug!(domain = %domain, error = %e, "DNS resolution failed");
                if is_nxdomain(&e) {
                    NetError::Dns(DnsError::NoSuchHost)
                } else {
                    NetError::from(e)
                }
            })?;

            let mut unique = Vec::with_capacity(addrs.len());
            for ip in addrs {
                if !unique.contains(&ip) {
                    unique.push(ip);
                }
            }
            if unique.is_empty() {
                return Err(DnsError::NoResponse.into());
            }

            tracing::debug!(domain = %domain, count = unique.len(), "DNS resolution complete");
            Ok(unique)
        })
    }
}
