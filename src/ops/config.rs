use crate::dns::system::SystemResolver;
use crate::http::transport::SystemHttpTransport;
use crate::ops::{Connector, HttpTransport, Resolver, TlsHandshaker};
use crate::socket::system::SystemConnector;
use crate::tls::handshake::SystemHandshaker;
use std::fmt;
use std::sync::{Arc, LazyLock};

static DEFAULT: LazyLock<Arc<Config>> = LazyLock::new(|| Arc::new(Config::new()));

/// The capability set: one implementation per network operation.
///
/// A `Config` is immutable once shared. Decorators build a new `Config`
/// around an existing one with the `map_*` helpers.
#[derive(Clone)]
pub struct Config {
    pub resolver: Arc<dyn Resolver>,
    pub connector: Arc<dyn Connector>,
    pub tls_handshaker: Arc<dyn TlsHandshaker>,
    pub http_transport: Arc<dyn HttpTransport>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// The system implementations: getaddrinfo, the OS socket stack,
    /// BoringSSL and hyper.
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(SystemResolver::new()),
            connector: Arc::new(SystemConnector::new()),
            tls_handshaker: Arc::new(SystemHandshaker::new()),
            http_transport: Arc::new(SystemHttpTransport::new()),
        }
    }

    /// The process-wide default, used when a context has no bound config.
    pub fn shared_default() -> Arc<Config> {
        DEFAULT.clone()
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_tls_handshaker(mut self, handshaker: Arc<dyn TlsHandshaker>) -> Self {
        self.tls_handshaker = handshaker;
        self
    }

    pub fn with_http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = transport;
        self
    }

    pub fn map_resolver(
        mut self,
        f: impl FnOnce(Arc<dyn Resolver>) -> Arc<dyn Resolver>,
    ) -> Self {
        self.resolver = f(self.resolver);
        self
    }

    pub fn map_connector(
        mut self,
        f: impl FnOnce(Arc<dyn Connector>) -> Arc<dyn Connector>,
    ) -> Self {
        self.connector = f(self.connector);
        self
    }

    pub fn map_tls_handshaker(
        mut self,
        f: impl FnOnce(Arc<dyn TlsHandshaker>) -> Arc<dyn TlsHandshaker>,
    ) -> Self {
        self.tls_handshaker = f(self.tls_handshaker);
        self
    }

    pub fn map_http_transport(
        mut self,
        f: impl FnOnce(Arc<dyn HttpTransport>) -> Arc<dyn HttpTransport>,
    ) -> Self {
        self.http_transport = f(self.http_transport);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}
