use crate::base::neterror::NetError;
use crate::ops::{Config, Context};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Sends one encoded query and returns the encoded reply.
///
/// Transports never retry; the resolver owns retry policy.
pub trait DnsTransport: Send + Sync {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        query: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, NetError>>;

    /// Whether queries sent over this transport should be padded.
    fn requires_padding(&self) -> bool;

    /// One of `udp`, `tcp`, `dot`, `doh`.
    fn network(&self) -> &'static str;

    fn address(&self) -> &str;
}

impl<T: DnsTransport + ?Sized> DnsTransport for Arc<T> {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        query: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, NetError>> {
        (**self).round_trip(ctx, query)
    }

    fn requires_padding(&self) -> bool {
        (**self).requires_padding()
    }

    fn network(&self) -> &'static str {
        (**self).network()
    }

    fn address(&self) -> &str {
        (**self).address()
    }
}

/// The context a transport dials with: its own capability set when one
/// was given, the caller's otherwise.
///
/// A transport that backs the resolver of some config must be given a
/// config whose resolver is a different one, or dialing a hostname would
/// recurse into itself.
pub(crate) fn dial_context_for(ctx: &Context, config: Option<&Arc<Config>>) -> Context {
    match config {
        Some(config) => ctx.with_config(config.clone()),
        None => ctx.clone(),
    }
}
