//! Caching of successful lookups.

use crate::base::neterror::NetError;
use crate::ops::{Context, Resolver};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::net::IpAddr;

/// Resolver decorator remembering every successful lookup.
///
/// Entries never expire and failures are never cached. Thread-safe via
/// DashMap, so one cache can back concurrent lookups.
#[derive(Debug)]
pub struct CacheResolver<R> {
    inner: R,
    entries: DashMap<String, Vec<IpAddr>>,
}

impl<R> CacheResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, domain: &str) -> Option<Vec<IpAddr>> {
        self.entries.get(domain).map(|entry| entry.clone())
    }

    /// Seeds the cache, e.g. with addresses learned out of band.
    pub fn set(&self, domain: impl Into<String>, addrs: Vec<IpAddr>) {
        self.entries.insert(domain.into(), addrs);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: Resolver> Resolver for CacheResolver<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            if let Some(addrs) = self.get(domain) {
                tracing::trace!(domain, "dns cache hit");
                return Ok(addrs);
            }
            let addrs = self.inner.lookup_host(ctx, domain).await?;
            self.set(domain, addrs.clone());
            Ok(addrs)
        })
    }
}
