use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rustls::client::Resumption;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};

use crate::core::errors::PodProbeError;

/// Server certificate "verifier" that trusts everything and remembers the
/// chain presented by the most recent handshake. A prober has to talk to
/// servers whose roots it does not know yet; collecting those roots is the
/// point.
#[derive(Debug)]
pub struct ChainRecorder {
    provider: Arc<CryptoProvider>,
    chain: Mutex<Vec<Vec<u8>>>,
}

impl ChainRecorder {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self {
            provider,
            chain: Mutex::new(Vec::new()),
        }
    }

    pub fn clear(&self) {
        self.chain.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// The last recorded chain, leaf first. Leaves the recorder empty.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.chain.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl ServerCertVerifier for ChainRecorder {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let mut chain = Vec::with_capacity(intermediates.len() + 1);
        chain.push(end_entity.as_ref().to_vec());
        chain.extend(intermediates.iter().map(|c| c.as_ref().to_vec()));

        *self.chain.lock().unwrap_or_else(|e| e.into_inner()) = chain;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Client certificate chain and key presented when a server asks for one.
#[derive(Debug)]
pub struct ClientIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, PodProbeError> {
        let mut reader = BufReader::new(File::open(cert_path)?);
        let chain = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
        if chain.is_empty() {
            return Err(PodProbeError::Tls(format!(
                "no certificates found in {}",
                cert_path.display()
            )));
        }

        let mut reader = BufReader::new(File::open(key_path)?);
        let key = rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
            PodProbeError::Tls(format!("no private key found in {}", key_path.display()))
        })?;

        Ok(Self { chain, key })
    }

    pub fn certificate_count(&self) -> usize {
        self.chain.len()
    }
}

pub fn client_config(
    recorder: Arc<ChainRecorder>,
    identity: Option<ClientIdentity>,
) -> Result<ClientConfig, PodProbeError> {
    let builder = ClientConfig::builder_with_provider(recorder.provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| PodProbeError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(recorder);

    let mut config = match identity {
        Some(identity) => builder
            .with_client_auth_cert(identity.chain, identity.key)
            .map_err(|e| PodProbeError::Tls(e.to_string()))?,
        None => builder.with_no_client_auth(),
    };
    // a resumed session skips certificate verification, so nothing is recorded
    config.resumption = Resumption::disabled();
    Ok(config)
}

pub fn default_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
