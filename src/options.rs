//! Loadable options for building a decorated capability set.
//!
//! ```json
//! {
//!   "dns": { "network": "dot", "address": "1.1.1.1", "max_attempts": 3 },
//!   "tls": { "force_sni": "example.org" },
//!   "log_prefix": "[web_connectivity] ",
//!   "record_events": true
//! }
//! ```

use crate::base::neterror::NetError;
use crate::decorator::bytecounter::{self, Counter};
use crate::decorator::saver::{self, EventLog};
use crate::decorator::{errwrapper, logger};
use crate::dns::{
    new_resolver_with, BogonResolver, CacheResolver, IdnaResolver, ResolverSettings, RetryPolicy,
    SystemResolver,
};
use crate::http::SystemHttpTransport;
use crate::ops::{Config, Resolver};
use crate::socket::SystemConnector;
use crate::tls::{SystemHandshaker, TlsConfig, TlsVersion};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DnsOptions {
    /// `system`, `udp`, `tcp`, `dot` or `doh`.
    pub network: String,
    /// Server `host[:port]`, or URL for `doh`.
    pub address: String,
    pub max_attempts: usize,
    /// Per-exchange timeout; the transport default when unset.
    pub timeout_ms: Option<u64>,
    pub reject_bogons: bool,
    /// Remember successful lookups for the lifetime of the session.
    pub cache: bool,
    /// TLS settings for `dot` and `doh` servers. The top-level `tls`
    /// options never apply to the resolver's own connections.
    pub tls: Option<TlsOptions>,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            network: "system".to_owned(),
            address: String::new(),
            max_attempts: RetryPolicy::default().max_attempts,
            timeout_ms: None,
            reject_bogons: false,
            cache: false,
            tls: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsOptions {
    pub force_sni: Option<String>,
    pub insecure_skip_verify: bool,
    pub ca_file: Option<PathBuf>,
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
}

impl TlsOptions {
    pub fn to_tls_config(&self) -> TlsConfig {
        TlsConfig {
            server_name: self.force_sni.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
            ca_file: self.ca_file.clone(),
            min_version: self.min_version,
            max_version: self.max_version,
            ..TlsConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub dns: DnsOptions,
    pub tls: TlsOptions,
    pub connect_timeout_ms: u64,
    pub tls_handshake_timeout_ms: u64,
    /// Log every operation; lines carry this prefix.
    pub log_prefix: Option<String>,
    pub wrap_errors: bool,
    pub count_bytes: bool,
    pub record_events: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dns: DnsOptions::default(),
            tls: TlsOptions::default(),
            connect_timeout_ms: 30_000,
            tls_handshake_timeout_ms: 10_000,
            log_prefix: None,
            wrap_errors: true,
            count_bytes: true,
            record_events: false,
        }
    }
}

/// A built capability set plus handles on its decorators' state.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Arc<Config>,
    pub bytes: Option<Arc<Counter>>,
    pub events: Option<Arc<EventLog>>,
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        serde_json::from_str(json).map_err(|e| NetError::Config(format!("invalid options: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| NetError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Builds the capability set, decorated outermost first with logging,
    /// event recording, error wrapping and byte counting as enabled.
    ///
    /// DNS transports dial through the byte-counted base set, so their
    /// traffic is counted too, but are not themselves logged or wrapped;
    /// their errors are classified once, as `resolve` failures. The base
    /// set's HTTP transport uses default TLS settings; `tls` applies only
    /// to the returned set.
    pub fn build(&self) -> Result<Session, NetError> {
        let base = Config {
            resolver: Arc::new(SystemResolver::new()),
            connector: Arc::new(
                SystemConnector::new().with_timeout(Duration::from_millis(self.connect_timeout_ms)),
            ),
            tls_handshaker: Arc::new(
                SystemHandshaker::new()
                    .with_timeout(Duration::from_millis(self.tls_handshake_timeout_ms)),
            ),
            http_transport: Arc::new(SystemHttpTransport::new()),
        };

        let bytes = self.count_bytes.then(Counter::new);
        let base = match &bytes {
            Some(counter) => bytecounter::wrap(base, counter.clone(), None),
            None => base,
        };
        let base = Arc::new(base);

        let mut resolver = self.dns_resolver(base.clone())?;
        if self.dns.cache {
            resolver = Arc::new(CacheResolver::new(resolver));
        }
        if self.dns.reject_bogons {
            resolver = Arc::new(BogonResolver::new(resolver));
        }
        let resolver = Arc::new(IdnaResolver::new(resolver));
        let transport = SystemHttpTransport::new().with_tls_config(self.tls.to_tls_config());
        let mut config = (*base)
            .clone()
            .with_resolver(resolver)
            .with_http_transport(Arc::new(transport));

        if self.wrap_errors {
            config = errwrapper::wrap(config);
        }
        let events = self.record_events.then(EventLog::new);
        if let Some(log) = &events {
            config = saver::wrap(config, log);
        }
        if let Some(prefix) = &self.log_prefix {
            config = logger::wrap(config, prefix);
        }

        Ok(Session {
            config: Arc::new(config),
            bytes,
            events,
        })
    }

    fn dns_resolver(&self, dialer: Arc<Config>) -> Result<Arc<dyn Resolver>, NetError> {
        let dns = &self.dns;
        let settings = ResolverSettings {
            policy: RetryPolicy::with_max_attempts(dns.max_attempts),
            timeout: dns.timeout_ms.map(Duration::from_millis),
            tls: dns.tls.as_ref().map(TlsOptions::to_tls_config),
        };
        new_resolver_with(&dns.network, &dns.address, Some(dialer), &settings)
    }
}
