//! Composite helpers: resolve, then connect, then handshake.
//!
//! Each helper fetches the capability set from the context, so a decorated
//! config bound with [`Context::with_config`] applies to every step.

use crate::base::neterror::{ConnectError, NetError};
use crate::ops::{Context, HttpRequest, HttpResponse};
use crate::socket::BoxedSocket;
use crate::tls::{TlsConfig, TlsState};
use std::net::IpAddr;
use tracing::debug;

/// ALPN preference used when the TLS template leaves it unset.
pub const DEFAULT_ALPN: [&str; 2] = ["h2", "http/1.1"];

/// Resolves `domain` with the context's resolver.
pub async fn lookup_host(ctx: &Context, domain: &str) -> Result<Vec<IpAddr>, NetError> {
    let config = ctx.config_or_default();
    config.resolver.lookup_host(ctx, domain).await
}

/// Performs one HTTP exchange with the context's transport.
pub async fn round_trip(ctx: &Context, req: HttpRequest) -> Result<HttpResponse, NetError> {
    let config = ctx.config_or_default();
    config.http_transport.round_trip(ctx, req).await
}

/// Connects to `address` (`host:port`).
///
/// A literal host is dialed directly. Otherwise the host is resolved and
/// each address is tried in order until one connects. When all fail the
/// returned [`ConnectError`] holds one error per attempted address.
pub async fn dial_context(
    ctx: &Context,
    network: &str,
    address: &str,
) -> Result<BoxedSocket, NetError> {
    let (host, port) = split_host_port(address)?;
    let config = ctx.config_or_default();

    let addrs = match host.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => config.resolver.lookup_host(ctx, host).await?,
    };
    if addrs.is_empty() {
        return Err(NetError::NoAddresses);
    }

    let mut errors = Vec::with_capacity(addrs.len());
    for ip in addrs {
        let target = join_host_port(&ip.to_string(), port);
        match config.connector.dial(ctx, network, &target).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                debug!(address = %target, error = %e, "dial attempt failed");
                errors.push(e);
            }
        }
        if ctx.is_expired() {
            break;
        }
    }
    Err(ConnectError { errors }.into())
}

/// [`dial_tls_context_config`] with an empty template.
pub async fn dial_tls_context(
    ctx: &Context,
    network: &str,
    address: &str,
) -> Result<(BoxedSocket, TlsState), NetError> {
    dial_tls_context_config(ctx, network, address, &TlsConfig::default()).await
}

/// Connects to `address` and performs a TLS handshake.
///
/// The template is cloned; the clone gets `server_name` from the host and
/// ALPN `h2, http/1.1` unless the template sets them.
pub async fn dial_tls_context_config(
    ctx: &Context,
    network: &str,
    address: &str,
    template: &TlsConfig,
) -> Result<(BoxedSocket, TlsState), NetError> {
    let (host, _) = split_host_port(address)?;
    let conn = dial_context(ctx, network, address).await?;

    let mut tls = template.clone();
    if tls.server_name.is_none() {
        tls.server_name = Some(host.to_owned());
    }
    if tls.alpn_protocols.is_none() {
        tls.alpn_protocols = Some(DEFAULT_ALPN.iter().map(|p| p.to_string()).collect());
    }

    let config = ctx.config_or_default();
    config.tls_handshaker.handshake(ctx, conn, &tls).await
}

/// Splits `host:port`, accepting bracketed IPv6 hosts.
pub fn split_host_port(address: &str) -> Result<(&str, u16), NetError> {
    let invalid = || NetError::InvalidAddress(address.to_owned());

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
        let port = rest.strip_prefix(':').ok_or_else(invalid)?;
        (host, port)
    } else {
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        if host.contains(':') {
            // unbracketed IPv6 literal
            return Err(invalid());
        }
        (host, port)
    };
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}

/// Joins a host and a port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
