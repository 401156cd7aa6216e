use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::extensions::GeneralName;

const UNPARSEABLE: &str = "<unparseable certificate>";

/// A server certificate as we record it. Identity is the SHA-256 fingerprint
/// of the DER encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub fingerprint: String,
    pub subject: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt_names: Vec<String>,
    pub pem: String,
}

impl CertificateInfo {
    pub fn from_der(der: &[u8]) -> Self {
        let fingerprint = fingerprint(der);
        let pem = to_pem(der);

        match x509_parser::parse_x509_certificate(der) {
            Ok((_, cert)) => {
                let alt_names = match cert.subject_alternative_name() {
                    Ok(Some(san)) => san
                        .value
                        .general_names
                        .iter()
                        .filter_map(describe_general_name)
                        .collect(),
                    _ => Vec::new(),
                };

                Self {
                    fingerprint,
                    subject: cert.subject().to_string(),
                    issuer: cert.issuer().to_string(),
                    alt_names,
                    pem,
                }
            }
            Err(e) => {
                tracing::debug!("Failed to parse certificate {}: {}", fingerprint, e);
                Self {
                    fingerprint,
                    subject: UNPARSEABLE.to_string(),
                    issuer: UNPARSEABLE.to_string(),
                    alt_names: Vec::new(),
                    pem,
                }
            }
        }
    }
}

fn describe_general_name(name: &GeneralName<'_>) -> Option<String> {
    match name {
        GeneralName::DNSName(s) => Some(format!("DNS:{}", s)),
        GeneralName::RFC822Name(s) => Some(format!("email:{}", s)),
        GeneralName::URI(s) => Some(format!("URI:{}", s)),
        GeneralName::IPAddress(bytes) => match bytes.len() {
            4 => {
                let octets: [u8; 4] = [bytes[0], bytes[1], bytes[2], bytes[3]];
                Some(format!("IP:{}", std::net::Ipv4Addr::from(octets)))
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                Some(format!("IP:{}", std::net::Ipv6Addr::from(octets)))
            }
            _ => None,
        },
        _ => None,
    }
}

pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn to_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        // base64 output is always ASCII
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Root and leaf certificates seen during one run, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct CertificateSets {
    trust: IndexMap<String, CertificateInfo>,
    leaves: IndexMap<String, CertificateInfo>,
}

impl CertificateSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a presented chain (leaf first) into the sets. The last entry is
    /// taken as the root. Returns the root and leaf that were recorded.
    pub fn absorb_chain(&mut self, chain: &[Vec<u8>]) -> Option<(CertificateInfo, CertificateInfo)> {
        let (leaf_der, root_der) = (chain.first()?, chain.last()?);

        let root = CertificateInfo::from_der(root_der);
        let leaf = CertificateInfo::from_der(leaf_der);

        self.trust
            .entry(root.fingerprint.clone())
            .or_insert_with(|| root.clone());
        self.leaves
            .entry(leaf.fingerprint.clone())
            .or_insert_with(|| leaf.clone());

        Some((root, leaf))
    }

    pub fn trust_certs(&self) -> impl Iterator<Item = &CertificateInfo> {
        self.trust.values()
    }

    pub fn leaf_certs(&self) -> impl Iterator<Item = &CertificateInfo> {
        self.leaves.values()
    }

    #[cfg(test)]
    pub fn trust_len(&self) -> usize {
        self.trust.len()
    }

    #[cfg(test)]
    pub fn leaf_len(&self) -> usize {
        self.leaves.len()
    }
}
