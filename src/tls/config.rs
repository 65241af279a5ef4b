use crate::base::neterror::NetError;
use boring::ssl::{SslConnectorBuilder, SslVerifyMode, SslVersion};
use serde::Deserialize;
use std::path::PathBuf;

/// Protocol versions that can bound a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "TLSv1.0")]
    Tls10,
    #[serde(rename = "TLSv1.1")]
    Tls11,
    #[serde(rename = "TLSv1.2")]
    Tls12,
    #[serde(rename = "TLSv1.3")]
    Tls13,
}

impl TlsVersion {
    fn to_ssl(self) -> SslVersion {
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }
}

/// Per-handshake TLS settings.
///
/// Unset fields keep BoringSSL's defaults. `dial_tls_context_config` fills
/// `server_name` and `alpn_protocols` on a clone when they are `None`; an
/// explicit empty ALPN list disables ALPN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub server_name: Option<String>,
    pub alpn_protocols: Option<Vec<String>>,
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
    pub cipher_list: Option<String>,
    pub insecure_skip_verify: bool,
    /// PEM bundle of extra trust anchors.
    pub ca_file: Option<PathBuf>,
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `sni` instead of the dialed host.
    pub fn force_sni(mut self, sni: impl Into<String>) -> Self {
        self.server_name = Some(sni.into());
        self
    }

    pub fn with_alpn<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alpn_protocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    pub fn with_versions(mut self, min: Option<TlsVersion>, max: Option<TlsVersion>) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder
                .set_min_proto_version(Some(min.to_ssl()))
                .map_err(|e| NetError::Config(format!("tls min version: {e}")))?;
        }
        if let Some(max) = self.max_version {
            builder
                .set_max_proto_version(Some(max.to_ssl()))
                .map_err(|e| NetError::Config(format!("tls max version: {e}")))?;
        }
        if let Some(ciphers) = &self.cipher_list {
            builder
                .set_cipher_list(ciphers)
                .map_err(|e| NetError::Config(format!("tls cipher list: {e}")))?;
        }
        if let Some(protocols) = &self.alpn_protocols {
            if !protocols.is_empty() {
                let wire = alpn_wire(protocols)?;
                builder
                    .set_alpn_protos(&wire)
                    .map_err(|e| NetError::Config(format!("tls alpn: {e}")))?;
            }
        }
        if let Some(path) = &self.ca_file {
            builder
                .set_ca_file(path)
                .map_err(|e| NetError::Config(format!("tls ca file {}: {e}", path.display())))?;
        }
        if self.insecure_skip_verify {
            builder.set_verify(SslVerifyMode::NONE);
        } else {
            builder.set_verify(SslVerifyMode::PEER);
        }
        Ok(())
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        !host.is_empty() && host.parse::<std::net::IpAddr>().is_err()
    }
}

/// Encodes protocol names as length-prefixed ALPN wire format.
pub fn alpn_wire(protocols: &[String]) -> Result<Vec<u8>, NetError> {
    let mut wire = Vec::new();
    for proto in protocols {
        let len = u8::try_from(proto.len())
            .ok()
            .filter(|len| *len > 0)
            .ok_or_else(|| NetError::Config(format!("invalid alpn protocol {proto:?}")))?;
        wire.push(len);
        wire.extend_from_slice(proto.as_bytes());
    }
    Ok(wire)
}
