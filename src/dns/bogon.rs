//! Detection of bogon replies.
//!
//! A censor that injects DNS replies often answers with private or
//! reserved addresses. Such replies for a public name are reported as
//! `dns_bogon_error`.

use crate::base::neterror::{DnsError, NetError};
use crate::ops::{Context, Resolver};
use futures::future::BoxFuture;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Whether `ip` is private, reserved or otherwise not globally routable.
pub fn is_bogon(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_bogon_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_bogon_v4(v4),
            None => is_bogon_v6(v6),
        },
    }
}

fn is_bogon_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        || a >= 240
        // shared address space, 100.64.0.0/10
        || (a == 100 && (b & 0xc0) == 64)
        // IETF protocol assignments, 192.0.0.0/24
        || (a == 192 && b == 0 && ip.octets()[2] == 0)
        // benchmarking, 198.18.0.0/15
        || (a == 198 && (b & 0xfe) == 18)
}

fn is_bogon_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        // unique local, fc00::/7
        || (first & 0xfe00) == 0xfc00
        // link local, fe80::/10
        || (first & 0xffc0) == 0xfe80
        // documentation, 2001:db8::/32
        || (first == 0x2001 && ip.segments()[1] == 0x0db8)
}

/// Resolver decorator failing with [`DnsError::Bogon`] when a name that is
/// not itself a literal resolves to any bogon address.
#[derive(Debug, Clone)]
pub struct BogonResolver<R> {
    inner: R,
}

impl<R> BogonResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Resolver> Resolver for BogonResolver<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            let addrs = self.inner.lookup_host(ctx, domain).await?;
            if domain.parse::<IpAddr>().is_err() && addrs.iter().any(|ip| is_bogon(*ip)) {
                tracing::debug!(domain, addrs = ?addrs, "bogon reply");
                return Err(DnsError::Bogon.into());
            }
            Ok(addrs)
        })
    }
}
