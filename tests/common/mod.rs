//! Helpers shared by the integration tests: a throwaway certificate
//! authority, a BoringSSL acceptor and canned DNS servers.

#![allow(dead_code)]

use boring::asn1::Asn1Time;
use boring::bn::{BigNum, MsbOption};
use boring::hash::MessageDigest;
use boring::nid::Nid;
use boring::pkey::{PKey, Private};
use boring::rsa::Rsa;
use boring::ssl::{select_next_proto, AlpnError, SslAcceptor, SslMethod};
use boring::x509::extension::{BasicConstraints, SubjectAlternativeName};
use boring::x509::{X509NameBuilder, X509};
use probenet::dns::message::QueryType;
use std::io::Write;
use std::net::IpAddr;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

/// A self-signed certificate valid for `localhost` and `127.0.0.1`.
pub fn self_signed() -> (X509, PKey<Private>) {
    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "localhost").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = {
        let mut serial = BigNum::new().unwrap();
        serial.rand(127, MsbOption::MAYBE_ZERO, false).unwrap();
        serial.to_asn1_integer().unwrap()
    };
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

/// Writes `cert` to a PEM file usable as `ca_file`.
pub fn pem_file(cert: &X509) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&cert.to_pem().unwrap()).unwrap();
    file.flush().unwrap();
    file
}

/// An acceptor serving `cert`; selects `http/1.1` when the client offers it.
pub fn acceptor(cert: &X509, key: &PKey<Private>) -> SslAcceptor {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_certificate(cert).unwrap();
    acceptor.set_private_key(key).unwrap();
    acceptor.set_alpn_select_callback(|_, client| {
        select_next_proto(b"\x08http/1.1", client).ok_or(AlpnError::NOACK)
    });
    acceptor.build()
}

/// Builds a reply to `query` carrying `ips` as A/AAAA answers.
pub fn reply_to(query: &[u8], rcode: u8, ips: &[IpAddr]) -> Vec<u8> {
    // question ends after the name's terminating zero plus type and class
    let mut end = 12;
    while query[end] != 0 {
        end += 1 + query[end] as usize;
    }
    end += 1 + 4;
    let qtype = u16::from_be_bytes([query[end - 4], query[end - 3]]);

    let answers: Vec<&IpAddr> = ips
        .iter()
        .filter(|ip| match ip {
            IpAddr::V4(_) => qtype == QueryType::A.code(),
            IpAddr::V6(_) => qtype == QueryType::Aaaa.code(),
        })
        .collect();

    let mut reply = Vec::new();
    reply.extend_from_slice(&query[..2]);
    reply.extend_from_slice(&[0x81, 0x80 | rcode]); // QR RD RA
    reply.extend_from_slice(&1u16.to_be_bytes());
    reply.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    reply.extend_from_slice(&[0, 0, 0, 0]);
    reply.extend_from_slice(&query[12..end]);
    for ip in answers {
        reply.extend_from_slice(&[0xc0, 0x0c]); // pointer to the question name
        reply.extend_from_slice(&qtype.to_be_bytes());
        reply.extend_from_slice(&1u16.to_be_bytes());
        reply.extend_from_slice(&60u32.to_be_bytes());
        match ip {
            IpAddr::V4(v4) => {
                reply.extend_from_slice(&4u16.to_be_bytes());
                reply.extend_from_slice(&v4.octets());
            }
            IpAddr::V6(v6) => {
                reply.extend_from_slice(&16u16.to_be_bytes());
                reply.extend_from_slice(&v6.octets());
            }
        }
    }
    reply
}

/// Reads one HTTP/1.1 request, returning the lowercased head and the body.
pub async fn read_request<S: AsyncRead + Unpin>(socket: &mut S) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some((head, buf[header_end..header_end + content_length].to_vec()))
}

/// Answers one request on `socket`: DNS-over-HTTPS POSTs get an answer
/// carrying `ips`, anything else gets `hello`.
pub async fn answer_request<S: AsyncRead + AsyncWrite + Unpin>(socket: &mut S, ips: &[IpAddr]) {
    let Some((head, body)) = read_request(socket).await else {
        return;
    };
    let (content_type, body) = if head.starts_with("post /dns-query") {
        ("application/dns-message", reply_to(&body, 0, ips))
    } else {
        ("text/plain", b"hello".to_vec())
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&body).await;
}

/// Serves HTTP/1.1 over TLS with `acceptor`, one request per connection.
pub async fn serve_https(listener: TcpListener, acceptor: SslAcceptor, ips: Vec<IpAddr>) {
    while let Ok((stream, _)) = listener.accept().await {
        let acceptor = acceptor.clone();
        let ips = ips.clone();
        tokio::spawn(async move {
            if let Ok(mut tls) = tokio_boring::accept(&acceptor, stream).await {
                answer_request(&mut tls, &ips).await;
                let _ = tls.shutdown().await;
            }
        });
    }
}
