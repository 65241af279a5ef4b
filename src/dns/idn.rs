//! Internationalized domain names.

use crate::base::neterror::{DnsError, NetError};
use crate::ops::{Context, Resolver};
use futures::future::BoxFuture;
use std::net::IpAddr;

/// Converts `domain` to its ASCII (punycode) form, e.g. `яндекс.рф` to
/// `xn--d1acpjx3f.xn--p1ai`.
pub fn to_ascii(domain: &str) -> Result<String, DnsError> {
    ::idna::domain_to_ascii(domain).map_err(|_| DnsError::InvalidName(domain.to_owned()))
}

/// Resolver decorator that punycodes names before handing them on.
#[derive(Debug, Clone)]
pub struct IdnaResolver<R> {
    inner: R,
}

impl<R> IdnaResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Resolver> Resolver for IdnaResolver<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            if domain.is_ascii() || domain.parse::<IpAddr>().is_ok() {
                return self.inner.lookup_host(ctx, domain).await;
            }
            let ascii = to_ascii(domain)?;
            self.inner.lookup_host(ctx, &ascii).await
        })
    }
}
