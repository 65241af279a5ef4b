//! The default [`HttpTransport`]: hyper over connections obtained from the
//! context's capability set.
//!
//! Each exchange opens its own connection; there is no pooling. `https`
//! URIs go through `dial_tls_context_config` and speak HTTP/2 when the
//! server selects `h2`, HTTP/1.1 otherwise.

use crate::base::neterror::NetError;
use crate::ops::{dial_context, dial_tls_context_config, join_host_port, Context};
use crate::ops::{HttpRequest, HttpResponse, HttpTransport};
use crate::tls::TlsConfig;
use futures::future::BoxFuture;
use http::header::{HeaderValue, HOST};
use http::uri::{PathAndQuery, Uri};
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SystemHttpTransport {
    tls: TlsConfig,
}

impl SystemHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// TLS template used for `https` exchanges.
    pub fn with_tls_config(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn tls_config(&self) -> &TlsConfig {
        &self.tls
    }
}

struct Target {
    secure: bool,
    address: String,
    authority: String,
}

fn target_of(uri: &Uri) -> Result<Target, NetError> {
    let secure = match uri.scheme_str() {
        Some("https") => true,
        Some("http") => false,
        Some(other) => return Err(NetError::InvalidRequest(format!("unsupported scheme {other}"))),
        None => return Err(NetError::InvalidRequest(format!("missing scheme in {uri}"))),
    };
    let authority = uri
        .authority()
        .ok_or_else(|| NetError::InvalidRequest(format!("missing host in {uri}")))?;
    let host = authority.host().trim_start_matches('[').trim_end_matches(']');
    let port = authority.port_u16().unwrap_or(if secure { 443 } else { 80 });
    Ok(Target {
        secure,
        address: join_host_port(host, port),
        authority: authority.as_str().to_owned(),
    })
}

/// Rewrites an absolute-form request into origin form with a Host header,
/// as HTTP/1.1 servers expect.
fn into_origin_form(mut req: HttpRequest, authority: &str) -> Result<HttpRequest, NetError> {
    let path = req
        .uri()
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    *req.uri_mut() = Uri::from(path);
    if !req.headers().contains_key(HOST) {
        let value = HeaderValue::from_str(authority)
            .map_err(|e| NetError::InvalidRequest(format!("invalid host header: {e}")))?;
        req.headers_mut().insert(HOST, value);
    }
    Ok(req)
}

impl HttpTransport for SystemHttpTransport {
    fn round_trip<'a>(
        &'a self,
        ctx: &'a Context,
        req: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, NetError>> {
        Box::pin(async move {
            let target = target_of(req.uri())?;

            let (socket, alpn) = if target.secure {
                let (socket, state) =
                    dial_tls_context_config(ctx, "tcp", &target.address, &self.tls).await?;
                (socket, state.negotiated_protocol)
            } else {
                (dial_context(ctx, "tcp", &target.address).await?, None)
            };
            let io = TokioIo::new(socket);

            if alpn.as_deref() == Some("h2") {
                let (mut sender, conn) = http2::handshake(TokioExecutor::new(), io).await?;
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(error = %e, "h2 connection closed with error");
                    }
                });
                ctx.run(async { sender.send_request(req).await.map_err(NetError::from) })
                    .await
            } else {
                let (mut sender, conn) = http1::handshake(io).await?;
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(error = %e, "http/1.1 connection closed with error");
                    }
                });
                let req = into_origin_form(req, &target.authority)?;
                ctx.run(async { sender.send_request(req).await.map_err(NetError::from) })
                    .await
            }
        })
    }
}
