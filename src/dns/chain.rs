//! Fallback between two resolvers.

use crate::base::neterror::NetError;
use crate::ops::{Context, Resolver};
use futures::future::BoxFuture;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Asks `primary` first and `secondary` only if `primary` fails.
#[derive(Clone)]
pub struct ChainResolver {
    primary: Arc<dyn Resolver>,
    secondary: Arc<dyn Resolver>,
}

impl ChainResolver {
    pub fn new(primary: Arc<dyn Resolver>, secondary: Arc<dyn Resolver>) -> Self {
        Self { primary, secondary }
    }
}

impl Resolver for ChainResolver {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            match self.primary.lookup_host(ctx, domain).await {
                Ok(addrs) => Ok(addrs),
                Err(e) => {
                    debug!(domain, error = %e, "primary resolver failed, trying secondary");
                    self.secondary.lookup_host(ctx, domain).await
                }
            }
        })
    }
}
