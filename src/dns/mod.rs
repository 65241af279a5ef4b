//! DNS resolution.
//!
//! Two families of [`Resolver`](crate::ops::Resolver):
//! - [`SystemResolver`]: getaddrinfo on the blocking pool
//! - [`DnsResolver`]: our own client over a [`DnsTransport`], which is one
//!   of [`UdpTransport`], [`TcpTransport`] (plain or TLS) and
//!   [`HttpsTransport`]
//!
//! Decorators: [`IdnaResolver`], [`CacheResolver`], [`BogonResolver`] and
//! [`ChainResolver`].
//!
//! # Example
//!
//! ```rust,ignore
//! use probenet::dns::new_resolver;
//! use probenet::ops::Context;
//!
//! let resolver = new_resolver("dot", "1.1.1.1", None)?;
//! let addrs = resolver.lookup_host(&Context::background(), "example.com").await?;
//! ```

pub mod bogon;
pub mod cache;
pub mod chain;
pub mod https;
pub mod idn;
pub mod message;
pub mod resolver;
pub mod system;
pub mod tcp;
pub mod transport;
pub mod udp;

pub use bogon::{is_bogon, BogonResolver};
pub use cache::CacheResolver;
pub use chain::ChainResolver;
pub use https::HttpsTransport;
pub use idn::IdnaResolver;
pub use resolver::{DnsResolver, RetryPolicy};
pub use system::SystemResolver;
pub use tcp::TcpTransport;
pub use transport::DnsTransport;
pub use udp::UdpTransport;

use crate::base::neterror::NetError;
use crate::ops::{join_host_port, split_host_port, Config, Resolver};
use crate::tls::TlsConfig;
use std::sync::Arc;
use std::time::Duration;

/// Appends `port` to `address` unless it already has one.
pub fn with_default_port(address: &str, port: u16) -> String {
    if split_host_port(address).is_ok() {
        return address.to_owned();
    }
    let host = address.trim_start_matches('[').trim_end_matches(']');
    join_host_port(host, port)
}

/// Tuning for [`new_resolver_with`].
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    pub policy: RetryPolicy,
    /// Per-exchange timeout replacing the transport's default.
    pub timeout: Option<Duration>,
    /// TLS template for `dot` and `doh` servers.
    pub tls: Option<TlsConfig>,
}

/// Builds a resolver for `network`: `system`, `udp`, `tcp`, `dot` or `doh`.
///
/// For `doh`, `address` is the server URL. Otherwise it is `host[:port]`,
/// with port 53 (853 for `dot`) when missing. Transports dial through
/// `config` when given, the caller's context otherwise.
pub fn new_resolver(
    network: &str,
    address: &str,
    config: Option<Arc<Config>>,
) -> Result<Arc<dyn Resolver>, NetError> {
    new_resolver_with(network, address, config, &ResolverSettings::default())
}

/// [`new_resolver`] with explicit [`ResolverSettings`].
pub fn new_resolver_with(
    network: &str,
    address: &str,
    config: Option<Arc<Config>>,
    settings: &ResolverSettings,
) -> Result<Arc<dyn Resolver>, NetError> {
    let needs_address = matches!(network, "udp" | "tcp" | "dot" | "doh");
    if needs_address && address.trim().is_empty() {
        return Err(NetError::Config(format!("{network} resolver needs an address")));
    }
    let build = |transport: Arc<dyn DnsTransport>| -> Arc<dyn Resolver> {
        Arc::new(DnsResolver::with_transport(transport).with_policy(settings.policy))
    };

    let resolver = match network {
        "system" => Arc::new(SystemResolver::new()) as Arc<dyn Resolver>,
        "udp" => {
            let mut t = UdpTransport::new(with_default_port(address, 53));
            if let Some(config) = config {
                t = t.with_config(config);
            }
            if let Some(timeout) = settings.timeout {
                t = t.with_timeout(timeout);
            }
            build(Arc::new(t))
        }
        "tcp" | "dot" => {
            let mut t = if network == "tcp" {
                TcpTransport::tcp(with_default_port(address, 53))
            } else {
                TcpTransport::tls(with_default_port(address, 853))
            };
            if let Some(config) = config {
                t = t.with_config(config);
            }
            if let Some(timeout) = settings.timeout {
                t = t.with_timeout(timeout);
            }
            if let Some(tls) = &settings.tls {
                t = t.with_tls_config(tls.clone());
            }
            build(Arc::new(t))
        }
        "doh" => {
            let mut t = HttpsTransport::new(address)?;
            if let Some(config) = config {
                t = t.with_config(config);
            }
            if let Some(timeout) = settings.timeout {
                t = t.with_timeout(timeout);
            }
            if let Some(tls) = &settings.tls {
                t = t.with_tls_config(tls.clone());
            }
            build(Arc::new(t))
        }
        other => return Err(NetError::UnsupportedNetwork(other.to_owned())),
    };
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_default_port() {
        assert_eq!(with_default_port("8.8.8.8", 53), "8.8.8.8:53");
        assert_eq!(with_default_port("8.8.8.8:5353", 53), "8.8.8.8:5353");
        assert_eq!(with_default_port("dns.google", 853), "dns.google:853");
        assert_eq!(with_default_port("2001:4860:4860::8888", 53), "[2001:4860:4860::8888]:53");
        assert_eq!(with_default_port("[::1]", 53), "[::1]:53");
        assert_eq!(with_default_port("[::1]:54", 53), "[::1]:54");
    }

    #[test]
    fn test_new_resolver_networks() {
        for network in ["system", "udp", "tcp", "dot"] {
            assert!(new_resolver(network, "1.1.1.1", None).is_ok(), "{network}");
        }
        assert!(new_resolver("doh", "https://cloudflare-dns.com/dns-query", None).is_ok());
        assert!(matches!(
            new_resolver("doq", "1.1.1.1", None),
            Err(NetError::UnsupportedNetwork(_))
        ));
        assert!(matches!(new_resolver("doh", "1.1.1.1", None), Err(NetError::Config(_))));
    }

    #[test]
    fn test_empty_address_is_rejected() {
        for network in ["udp", "tcp", "dot", "doh"] {
            assert!(
                matches!(new_resolver(network, "", None), Err(NetError::Config(_))),
                "{network}"
            );
        }
        assert!(matches!(new_resolver("udp", "  ", None), Err(NetError::Config(_))));
        assert!(new_resolver("system", "", None).is_ok());
        assert!(matches!(
            new_resolver("doq", "", None),
            Err(NetError::UnsupportedNetwork(_))
        ));
    }
}
