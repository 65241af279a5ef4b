//! Composite dial tests over mock capabilities.

use probenet::base::neterror::{DnsError, NetError};
use probenet::ops::{
    dial_context, dial_tls_context, dial_tls_context_config, lookup_host, Config, Connector,
    Context, Resolver, TlsHandshaker,
};
use probenet::socket::BoxedSocket;
use probenet::tls::{TlsConfig, TlsState};

use futures::future::BoxFuture;
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct StaticResolver {
    addrs: Vec<IpAddr>,
    lookups: Mutex<Vec<String>>,
}

impl StaticResolver {
    fn new(addrs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            addrs: addrs.iter().map(|a| a.parse().unwrap()).collect(),
            lookups: Mutex::new(Vec::new()),
        })
    }
}

impl Resolver for StaticResolver {
    fn lookup_host<'a>(
        &'a self,
        _ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(async move {
            self.lookups.lock().unwrap().push(domain.to_owned());
            Ok(self.addrs.clone())
        })
    }
}

/// Refuses every address except `accept`, answering with an in-memory pipe.
struct PickyConnector {
    accept: Option<String>,
    attempts: Mutex<Vec<String>>,
}

impl PickyConnector {
    fn new(accept: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            accept: accept.map(str::to_owned),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Connector for PickyConnector {
    fn dial<'a>(
        &'a self,
        _ctx: &'a Context,
        _network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(address.to_owned());
            if self.accept.as_deref() == Some(address) {
                let (client, mut server) = tokio::io::duplex(64);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4];
                    if server.read_exact(&mut buf).await.is_ok() {
                        let _ = server.write_all(b"pong").await;
                    }
                });
                Ok(BoxedSocket::new(client))
            } else {
                Err(NetError::io(io::ErrorKind::ConnectionRefused, "connection refused"))
            }
        })
    }
}

/// Takes a second per attempt, then gives up as timed out.
#[derive(Default)]
struct SlowConnector {
    attempts: Mutex<Vec<String>>,
}

impl Connector for SlowConnector {
    fn dial<'a>(
        &'a self,
        _ctx: &'a Context,
        _network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(address.to_owned());
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err(NetError::DeadlineExceeded)
        })
    }
}

/// Records the config it is given and succeeds without touching the wire.
#[derive(Default)]
struct RecordingHandshaker {
    seen: Mutex<Option<TlsConfig>>,
}

impl TlsHandshaker for RecordingHandshaker {
    fn handshake<'a>(
        &'a self,
        _ctx: &'a Context,
        conn: BoxedSocket,
        config: &'a TlsConfig,
    ) -> BoxFuture<'a, Result<(BoxedSocket, TlsState), NetError>> {
        Box::pin(async move {
            *self.seen.lock().unwrap() = Some(config.clone());
            let state = TlsState {
                version: "TLSv1.3".into(),
                negotiated_protocol: config
                    .alpn_protocols
                    .as_ref()
                    .and_then(|p| p.first().cloned()),
                ..TlsState::default()
            };
            Ok((conn, state))
        })
    }
}

fn context(
    resolver: Arc<StaticResolver>,
    connector: Arc<PickyConnector>,
    handshaker: Arc<RecordingHandshaker>,
) -> Context {
    let config = Config::new()
        .with_resolver(resolver)
        .with_connector(connector)
        .with_tls_handshaker(handshaker);
    Context::background().with_config(Arc::new(config))
}

#[tokio::test]
async fn test_second_address_succeeds() {
    let resolver = StaticResolver::new(&["192.0.2.1", "192.0.2.2"]);
    let connector = PickyConnector::new(Some("192.0.2.2:443"));
    let ctx = context(resolver, connector.clone(), Arc::default());

    let mut conn = dial_context(&ctx, "tcp", "example.com:443").await.unwrap();
    conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    assert_eq!(connector.attempts(), vec!["192.0.2.1:443", "192.0.2.2:443"]);
}

#[tokio::test]
async fn test_all_addresses_fail() {
    let resolver = StaticResolver::new(&["192.0.2.1", "2001:db8::1", "192.0.2.3"]);
    let connector = PickyConnector::new(None);
    let ctx = context(resolver, connector.clone(), Arc::default());

    let err = dial_context(&ctx, "tcp", "example.com:80").await.unwrap_err();
    let aggregate = err.as_connect_error().unwrap();
    assert_eq!(aggregate.errors.len(), 3);
    assert_eq!(err.to_string(), "connect_error");
    assert_eq!(
        connector.attempts(),
        vec!["192.0.2.1:80", "[2001:db8::1]:80", "192.0.2.3:80"]
    );
}

#[tokio::test]
async fn test_no_addresses() {
    let resolver = StaticResolver::new(&[]);
    let ctx = context(resolver, PickyConnector::new(None), Arc::default());

    let err = dial_context(&ctx, "tcp", "example.com:80").await.unwrap_err();
    assert!(matches!(err, NetError::NoAddresses));
}

#[tokio::test]
async fn test_literal_skips_resolver() {
    let resolver = StaticResolver::new(&["192.0.2.9"]);
    let connector = PickyConnector::new(Some("[2001:db8::7]:853"));
    let ctx = context(resolver.clone(), connector.clone(), Arc::default());

    dial_context(&ctx, "tcp", "[2001:db8::7]:853").await.unwrap();
    assert!(resolver.lookups.lock().unwrap().is_empty());
    assert_eq!(connector.attempts(), vec!["[2001:db8::7]:853"]);
}

#[tokio::test]
async fn test_invalid_address() {
    let ctx = context(
        StaticResolver::new(&[]),
        PickyConnector::new(None),
        Arc::default(),
    );
    for address in ["example.com", "2001:db8::1:443", "example.com:http"] {
        let err = dial_context(&ctx, "tcp", address).await.unwrap_err();
        assert!(matches!(err, NetError::InvalidAddress(_)), "{address}");
    }
}

#[tokio::test]
async fn test_tls_defaults_fill_a_clone() {
    let resolver = StaticResolver::new(&["192.0.2.1"]);
    let connector = PickyConnector::new(Some("192.0.2.1:443"));
    let handshaker = Arc::new(RecordingHandshaker::default());
    let ctx = context(resolver, connector, handshaker.clone());

    let (_, state) = dial_tls_context(&ctx, "tcp", "example.com:443").await.unwrap();
    assert_eq!(state.negotiated_protocol.as_deref(), Some("h2"));

    let seen = handshaker.seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen.server_name.as_deref(), Some("example.com"));
    assert_eq!(
        seen.alpn_protocols,
        Some(vec!["h2".to_string(), "http/1.1".to_string()])
    );
}

#[tokio::test]
async fn test_tls_template_is_respected_and_untouched() {
    let resolver = StaticResolver::new(&["192.0.2.1"]);
    let connector = PickyConnector::new(Some("192.0.2.1:443"));
    let handshaker = Arc::new(RecordingHandshaker::default());
    let ctx = context(resolver, connector, handshaker.clone());

    let template = TlsConfig::new()
        .force_sni("www.example.org")
        .with_alpn(["http/1.1"]);
    let before = template.clone();
    dial_tls_context_config(&ctx, "tcp", "example.com:443", &template)
        .await
        .unwrap();
    assert_eq!(template, before);

    let seen = handshaker.seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen.server_name.as_deref(), Some("www.example.org"));
    assert_eq!(seen.alpn_protocols, Some(vec!["http/1.1".to_string()]));

    // an empty template leaves nothing behind either
    let empty = TlsConfig::default();
    dial_tls_context_config(&ctx, "tcp", "example.com:443", &empty)
        .await
        .unwrap();
    assert_eq!(empty, TlsConfig::default());
}

#[tokio::test]
async fn test_resolver_error_propagates() {
    struct NxResolver;

    impl Resolver for NxResolver {
        fn lookup_host<'a>(
            &'a self,
            _ctx: &'a Context,
            _domain: &'a str,
        ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
            Box::pin(async { Err(DnsError::NoSuchHost.into()) })
        }
    }

    let config = Config::new().with_resolver(Arc::new(NxResolver));
    let ctx = Context::background().with_config(Arc::new(config));

    assert!(matches!(
        lookup_host(&ctx, "example.invalid").await,
        Err(NetError::Dns(DnsError::NoSuchHost))
    ));
    assert!(matches!(
        dial_context(&ctx, "tcp", "example.invalid:80").await,
        Err(NetError::Dns(DnsError::NoSuchHost))
    ));
}

#[tokio::test]
async fn test_real_loopback() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"hi").await.unwrap();
    });

    let ctx = Context::background().with_timeout(Duration::from_secs(5));
    let mut conn = dial_context(&ctx, "tcp", &addr.to_string()).await.unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hi");
}

#[tokio::test(start_paused = true)]
async fn test_expired_context_stops_after_current_address() {
    let resolver = StaticResolver::new(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]);
    let connector = Arc::new(SlowConnector::default());
    let config = Config::new()
        .with_resolver(resolver)
        .with_connector(connector.clone());
    let ctx = Context::background()
        .with_timeout(Duration::from_millis(500))
        .with_config(Arc::new(config));

    let err = dial_context(&ctx, "tcp", "example.com:443").await.unwrap_err();
    assert_eq!(*connector.attempts.lock().unwrap(), vec!["192.0.2.1:443"]);
    let aggregate = err.as_connect_error().unwrap();
    assert_eq!(aggregate.errors.len(), 1);
    assert!(matches!(aggregate.errors[0], NetError::DeadlineExceeded));
}
