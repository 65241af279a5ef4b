//! DNS query encoding and reply decoding.
//!
//! Queries are encoded by hand so that every byte on the wire, including
//! EDNS(0) padding (RFC 7830, sized per RFC 8467 block-length padding), is
//! under our control. Replies are decoded with hickory's message parser.

use crate::base::neterror::DnsError;
use hickory_resolver::proto::op::{Message, ResponseCode};
use hickory_resolver::proto::rr::RData;
use std::fmt;
use std::net::IpAddr;

/// Padded queries are a multiple of this size.
pub const DESIRED_BLOCK_SIZE: usize = 128;
/// UDP payload size advertised in the OPT record.
pub const MAX_RESPONSE_SIZE: u16 = 4096;

const HEADER_LEN: usize = 12;
const FLAG_RD: u16 = 0x0100;
const CLASS_IN: u16 = 1;
const TYPE_OPT: u16 = 41;
const OPTION_PADDING: u16 = 12;
// root name (1) + type (2) + class (2) + ttl (4) + rdlength (2)
const OPT_RR_LEN: usize = 11;
const OPTION_HEADER_LEN: usize = 4;
const MAX_LABEL_LEN: usize = 63;

/// Query types this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    A,
    Ns,
    Cname,
    Ptr,
    Mx,
    Aaaa,
}

impl QueryType {
    pub const fn code(self) -> u16 {
        match self {
            QueryType::A => 1,
            QueryType::Ns => 2,
            QueryType::Cname => 5,
            QueryType::Ptr => 12,
            QueryType::Mx => 15,
            QueryType::Aaaa => 28,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryType::A => "A",
            QueryType::Ns => "NS",
            QueryType::Cname => "CNAME",
            QueryType::Ptr => "PTR",
            QueryType::Mx => "MX",
            QueryType::Aaaa => "AAAA",
        })
    }
}

/// Returns `name` with exactly one trailing dot.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

/// Number of padding bytes for a query whose encoding, OPT record
/// included, is `len` bytes long.
pub fn padding_len(len: usize) -> usize {
    let remainder = (len + OPTION_HEADER_LEN) % DESIRED_BLOCK_SIZE;
    (DESIRED_BLOCK_SIZE - remainder) % DESIRED_BLOCK_SIZE
}

fn encode_name(buf: &mut Vec<u8>, name: &str) -> Result<(), DnsError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        // root
        buf.push(0);
        return Ok(());
    }
    for label in trimmed.split('.') {
        // internationalized names must be punycoded first
        if label.is_empty() || label.len() > MAX_LABEL_LEN || !label.is_ascii() {
            return Err(DnsError::InvalidName(name.to_owned()));
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    Ok(())
}

/// Encodes a recursive query for `name`.
///
/// With `padding`, an OPT record advertising [`MAX_RESPONSE_SIZE`] with the
/// DO bit set is appended, carrying a padding option that brings the
/// message length to a multiple of [`DESIRED_BLOCK_SIZE`].
pub fn build_query(
    id: u16,
    name: &str,
    qtype: QueryType,
    padding: bool,
) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(DESIRED_BLOCK_SIZE);
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&FLAG_RD.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    buf.extend_from_slice(&0u16.to_be_bytes()); // ancount
    buf.extend_from_slice(&0u16.to_be_bytes()); // nscount
    buf.extend_from_slice(&u16::from(padding).to_be_bytes()); // arcount

    encode_name(&mut buf, name)?;
    buf.extend_from_slice(&qtype.code().to_be_bytes());
    buf.extend_from_slice(&CLASS_IN.to_be_bytes());

    if padding {
        let pad = padding_len(buf.len() + OPT_RR_LEN);
        let rdlen = u16::try_from(OPTION_HEADER_LEN + pad)
            .map_err(|_| DnsError::QueryTooLarge(buf.len()))?;
        buf.push(0); // root owner
        buf.extend_from_slice(&TYPE_OPT.to_be_bytes());
        buf.extend_from_slice(&MAX_RESPONSE_SIZE.to_be_bytes());
        // extended rcode, version, DO bit
        buf.extend_from_slice(&[0, 0, 0x80, 0]);
        buf.extend_from_slice(&rdlen.to_be_bytes());
        buf.extend_from_slice(&OPTION_PADDING.to_be_bytes());
        buf.extend_from_slice(&(pad as u16).to_be_bytes());
        buf.resize(buf.len() + pad, 0);
    }
    Ok(buf)
}

/// Reads the transaction ID of an encoded message.
pub fn message_id(wire: &[u8]) -> Option<u16> {
    (wire.len() >= HEADER_LEN).then(|| u16::from_be_bytes([wire[0], wire[1]]))
}

/// Decodes a reply and checks it answers the query with ID `sent`.
pub fn parse_reply(wire: &[u8], sent: u16) -> Result<Message, DnsError> {
    let message = Message::from_vec(wire).map_err(|e| DnsError::Malformed(e.to_string()))?;
    if message.id() != sent {
        return Err(DnsError::IdMismatch {
            sent,
            received: message.id(),
        });
    }
    Ok(message)
}

/// Maps a response code to the client's error vocabulary.
///
/// Success maps to `Ok` even when the answer section is empty.
pub fn map_rcode(rcode: ResponseCode) -> Result<(), DnsError> {
    match rcode {
        ResponseCode::NoError => Ok(()),
        ResponseCode::NXDomain => Err(DnsError::NoSuchHost),
        other => Err(DnsError::QueryFailed {
            rcode: u16::from(other),
        }),
    }
}

/// Addresses from A and AAAA answers.
pub fn answer_ips(message: &Message) -> Vec<IpAddr> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}

/// Target names from CNAME, NS and PTR answers.
pub fn answer_names(message: &Message) -> Vec<String> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::CNAME(name) => Some(name.0.to_string()),
            RData::NS(name) => Some(name.0.to_string()),
            RData::PTR(name) => Some(name.0.to_string()),
            _ => None,
        })
        .collect()
}

/// A mail exchanger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mx {
    pub host: String,
    pub preference: u16,
}

pub fn answer_mx(message: &Message) -> Vec<Mx> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::MX(mx) => Some(Mx {
                host: mx.exchange().to_string(),
                preference: mx.preference(),
            }),
            _ => None,
        })
        .collect()
}

/// The PTR owner name for `ip`: `in-addr.arpa.` or `ip6.arpa.`.
pub fn reverse_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa.")
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(73);
            for byte in v6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
            name.push_str("ip6.arpa.");
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::op::MessageType;

    #[test]
    fn test_unpadded_query_layout() {
        let wire = build_query(0x1234, "example.com", QueryType::A, false).unwrap();
        assert_eq!(&wire[..2], &[0x12, 0x34]);
        assert_eq!(&wire[2..4], &[0x01, 0x00]);
        assert_eq!(&wire[10..12], &[0, 0]);
        assert_eq!(
            &wire[12..],
            b"\x07example\x03com\x00\x00\x01\x00\x01".as_slice()
        );
        assert_eq!(message_id(&wire), Some(0x1234));
    }

    #[test]
    fn test_padded_query_parses() {
        let wire = build_query(7, "example.com.", QueryType::Aaaa, true).unwrap();
        assert_eq!(wire.len() % DESIRED_BLOCK_SIZE, 0);

        let message = Message::from_vec(&wire).unwrap();
        assert_eq!(message.id(), 7);
        assert_eq!(message.message_type(), MessageType::Query);
        assert!(message.recursion_desired());
        assert_eq!(message.queries().len(), 1);
        assert_eq!(message.queries()[0].name().to_string(), "example.com.");
        let edns = message.extensions().as_ref().expect("padded queries carry OPT");
        assert_eq!(edns.max_payload(), MAX_RESPONSE_SIZE);
    }

    #[test]
    fn test_padding_for_many_lengths() {
        for n in 1..4000 {
            let name = "x.".repeat(n);
            let unpadded = build_query(1, &name, QueryType::A, false).unwrap();
            let padded = build_query(1, &name, QueryType::A, true).unwrap();
            assert!(unpadded.len() >= 2 * n, "unpadded shorter than name for {n}");
            assert_eq!(padded.len() % DESIRED_BLOCK_SIZE, 0, "bad padding for {n}");
            assert!(padded.len() >= unpadded.len());
            assert!(padded.len() - unpadded.len() < DESIRED_BLOCK_SIZE + OPT_RR_LEN + 4);
        }
    }

    #[test]
    fn test_padding_len() {
        assert_eq!(padding_len(124), 0);
        assert_eq!(padding_len(125), 127);
        assert_eq!(padding_len(0), 124);
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            build_query(1, "a..b", QueryType::A, false),
            Err(DnsError::InvalidName(_))
        ));
        let long = format!("{}.com", "a".repeat(64));
        assert!(build_query(1, &long, QueryType::A, false).is_err());
        assert!(build_query(1, ".", QueryType::Ns, false).is_ok());
        assert!(matches!(
            build_query(1, "яндекс.рф", QueryType::A, false),
            Err(DnsError::InvalidName(_))
        ));
        assert!(build_query(1, "xn--d1acpjx3f.xn--p1ai", QueryType::A, false).is_ok());
    }

    #[test]
    fn test_map_rcode() {
        assert_eq!(map_rcode(ResponseCode::NoError), Ok(()));
        assert_eq!(map_rcode(ResponseCode::NXDomain), Err(DnsError::NoSuchHost));
        for rcode in [ResponseCode::ServFail, ResponseCode::Refused, ResponseCode::FormErr] {
            let err = map_rcode(rcode).unwrap_err();
            assert!(err.to_string().ends_with("query failed"));
        }
    }

    #[test]
    fn test_parse_reply_checks_id() {
        let wire = build_query(42, "example.com", QueryType::A, false).unwrap();
        assert!(parse_reply(&wire, 42).is_ok());
        assert_eq!(
            parse_reply(&wire, 43).unwrap_err(),
            DnsError::IdMismatch {
                sent: 43,
                received: 42
            }
        );
        assert!(matches!(parse_reply(&wire[..5], 42), Err(DnsError::Malformed(_))));
    }

    #[test]
    fn test_reverse_name() {
        assert_eq!(
            reverse_name("192.0.2.1".parse().unwrap()),
            "1.2.0.192.in-addr.arpa."
        );
        let v6 = reverse_name("2001:db8::1".parse().unwrap());
        assert!(v6.starts_with("1.0.0.0.0.0.0.0."));
        assert!(v6.ends_with("8.b.d.0.1.0.0.2.ip6.arpa."));
        assert_eq!(v6.len(), 73);
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }
}
