//! DNS over HTTPS (RFC 8484), POST method.

use crate::base::neterror::{DnsError, NetError};
use crate::dns::transport::{dial_context_for, DnsTransport};
use crate::http::body::{full, read_body};
use crate::http::SystemHttpTransport;
use crate::ops::{Config, Context, HttpTransport};
use crate::tls::TlsConfig;
use futures::future::BoxFuture;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;

pub const DNS_MESSAGE: &str = "application/dns-message";
pub const DEFAULT_DOH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpsTransport {
    url: String,
    config: Option<Arc<Config>>,
    tls: Option<SystemHttpTransport>,
    timeout: Duration,
}

impl HttpsTransport {
    /// `url` must be an absolute `https://` (or `http://`) URL.
    pub fn new(url: impl Into<String>) -> Result<Self, NetError> {
        let url = url.into();
        let parsed = url::Url::parse(&url)
            .map_err(|e| NetError::Config(format!("invalid doh url {url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "https" | "http") || parsed.host_str().is_none() {
            return Err(NetError::Config(format!("invalid doh url {url:?}")));
        }
        Ok(Self {
            url,
            config: None,
            tls: None,
            timeout: DEFAULT_DOH_TIMEOUT,
        })
    }

    /// Capability set whose HTTP transport carries the queries.
    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends queries through a [`SystemHttpTransport`] using `tls` instead
    /// of the capability set's HTTP transport. Connections are still
    /// obtained from the capability set.
    pub fn with_tls_config(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(SystemHttpTransport::new().with_tls_config(tls));
        self
    }
}

impl DnsTransport for HttpsTransport {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        query: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, NetError>> {
        Box::pin(async move {
            let ctx = dial_context_for(ctx, self.config.as_ref());
            let req = Request::builder()
                .method(Method::POST)
                .uri(&self.url)
                .header(CONTENT_TYPE, DNS_MESSAGE)
                .header(ACCEPT, DNS_MESSAGE)
                .body(full(query.to_vec()))?;

            let exchange = async {
                let resp = match &self.tls {
                    Some(transport) => transport.round_trip(&ctx, req).await?,
                    None => {
                        let transport = ctx.config_or_default().http_transport.clone();
                        transport.round_trip(&ctx, req).await?
                    }
                };
                if resp.status() != StatusCode::OK {
                    return Err(DnsError::DohStatus(resp.status().as_u16()).into());
                }
                let content_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if content_type != DNS_MESSAGE {
                    return Err(DnsError::DohContentType.into());
                }
                let body = read_body(resp).await?;
                Ok::<_, NetError>(body.to_vec())
            };
            ctx.run_with_timeout(self.timeout, exchange).await
        })
    }

    fn requires_padding(&self) -> bool {
        true
    }

    fn network(&self) -> &'static str {
        "doh"
    }

    fn address(&self) -> &str {
        &self.url
    }
}
