//! A DNS client resolver over any [`DnsTransport`].

use crate::base::neterror::{DnsError, NetError};
use crate::dns::message::{self, Mx, QueryType};
use crate::dns::transport::DnsTransport;
use crate::ops::{Context, Resolver};
use futures::future::BoxFuture;
use hickory_resolver::proto::op::Message;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// How many times a query that timed out is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included (default: 3).
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    /// Send each query once.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

fn initial_id() -> u16 {
    let mut seed = [0u8; 2];
    match boring::rand::rand_bytes(&mut seed) {
        Ok(()) => u16::from_be_bytes(seed),
        Err(e) => {
            warn!(error = %e, "cannot seed dns transaction ids");
            0
        }
    }
}

pub struct DnsResolver {
    transport: Arc<dyn DnsTransport>,
    policy: RetryPolicy,
    next_id: AtomicU16,
    timeouts: AtomicU64,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver")
            .field("network", &self.transport.network())
            .field("address", &self.transport.address())
            .field("policy", &self.policy)
            .field("timeouts", &self.timeouts())
            .finish()
    }
}

impl DnsResolver {
    pub fn new(transport: impl DnsTransport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn DnsTransport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            next_id: AtomicU16::new(initial_id()),
            timeouts: AtomicU64::new(0),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn transport(&self) -> &Arc<dyn DnsTransport> {
        &self.transport
    }

    /// Number of attempts that failed with a timeout so far.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> u16 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Resolves A and AAAA records for `hostname`.
    ///
    /// Any address is success. Otherwise the A error wins over the AAAA
    /// error; two empty successful answers give an empty list.
    pub async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>, NetError> {
        if let Ok(ip) = hostname.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let mut addrs = Vec::new();
        let err_a = match self.lookup_ips(ctx, hostname, QueryType::A).await {
            Ok(ips) => {
                addrs.extend(ips);
                None
            }
            Err(e) => Some(e),
        };
        let err_aaaa = match self.lookup_ips(ctx, hostname, QueryType::Aaaa).await {
            Ok(ips) => {
                addrs.extend(ips);
                None
            }
            Err(e) => Some(e),
        };
        lookup_host_result(addrs, err_a, err_aaaa)
    }

    async fn lookup_ips(
        &self,
        ctx: &Context,
        hostname: &str,
        qtype: QueryType,
    ) -> Result<Vec<IpAddr>, NetError> {
        let reply = self.round_trip_with_retry(ctx, hostname, qtype).await?;
        Ok(message::answer_ips(&reply))
    }

    pub async fn lookup_cname(&self, ctx: &Context, hostname: &str) -> Result<String, NetError> {
        let reply = self.round_trip_with_retry(ctx, hostname, QueryType::Cname).await?;
        message::answer_names(&reply)
            .into_iter()
            .next()
            .ok_or_else(|| DnsError::NoResponse.into())
    }

    pub async fn lookup_ns(&self, ctx: &Context, hostname: &str) -> Result<Vec<String>, NetError> {
        let reply = self.round_trip_with_retry(ctx, hostname, QueryType::Ns).await?;
        Ok(message::answer_names(&reply))
    }

    pub async fn lookup_mx(&self, ctx: &Context, hostname: &str) -> Result<Vec<Mx>, NetError> {
        let reply = self.round_trip_with_retry(ctx, hostname, QueryType::Mx).await?;
        let mut records = message::answer_mx(&reply);
        records.sort_by_key(|mx| mx.preference);
        Ok(records)
    }

    /// Reverse lookup through PTR records.
    pub async fn lookup_addr(&self, ctx: &Context, ip: IpAddr) -> Result<Vec<String>, NetError> {
        let name = message::reverse_name(ip);
        let reply = self.round_trip_with_retry(ctx, &name, QueryType::Ptr).await?;
        Ok(message::answer_names(&reply))
    }

    /// Sends one query, retrying with a fresh ID while attempts time out.
    ///
    /// Every timed-out attempt bumps the timeout counter. The first error
    /// seen is the one returned.
    pub async fn round_trip_with_retry(
        &self,
        ctx: &Context,
        hostname: &str,
        qtype: QueryType,
    ) -> Result<Message, NetError> {
        let mut first_error = None;
        for attempt in 0..self.policy.max_attempts.max(1) {
            let err = match self.round_trip(ctx, hostname, qtype).await {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };
            let timed_out = err.is_timeout();
            if timed_out {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(hostname, %qtype, attempt, "dns query timed out");
            }
            first_error.get_or_insert(err);
            if !timed_out {
                break;
            }
        }
        Err(first_error.unwrap_or(NetError::Dns(DnsError::NoResponse)))
    }

    async fn round_trip(
        &self,
        ctx: &Context,
        hostname: &str,
        qtype: QueryType,
    ) -> Result<Message, NetError> {
        let id = self.next_id();
        let query = message::build_query(
            id,
            &message::fqdn(hostname),
            qtype,
            self.transport.requires_padding(),
        )?;
        let wire = self.transport.round_trip(ctx, &query).await?;
        let reply = message::parse_reply(&wire, id).inspect_err(|e| {
            warn!(hostname, network = self.transport.network(), error = %e, "bad dns reply");
        })?;
        message::map_rcode(reply.response_code())?;
        Ok(reply)
    }
}

fn lookup_host_result(
    addrs: Vec<IpAddr>,
    err_a: Option<NetError>,
    err_aaaa: Option<NetError>,
) -> Result<Vec<IpAddr>, NetError> {
    if !addrs.is_empty() {
        return Ok(addrs);
    }
    match (err_a, err_aaaa) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(addrs),
    }
}

impl Resolver for DnsResolver {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a Context,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<IpAddr>, NetError>> {
        Box::pin(DnsResolver::lookup_host(self, ctx, domain))
    }
}
