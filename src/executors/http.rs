use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use super::classify::{classify, render_chain};
use super::tls::{ChainRecorder, ClientIdentity, client_config, default_provider};
use super::transport::{FailureKind, ProbeRequest, RawResponse, Transport, TransportFailure};
use crate::config::NetworkConfig;
use crate::core::errors::PodProbeError;
use crate::probe::Method;

const MAX_REDIRECTS: usize = 10;

/// `reqwest`-backed transport. Every request performs a fresh TLS handshake
/// so the presented chain can be recorded for each probe.
pub struct ReqwestTransport {
    client: reqwest::Client,
    recorder: Arc<ChainRecorder>,
}

impl ReqwestTransport {
    pub fn new(network: &NetworkConfig, identity: Option<ClientIdentity>) -> Result<Self, PodProbeError> {
        let recorder = Arc::new(ChainRecorder::new(default_provider()));
        let tls = client_config(recorder.clone(), identity)?;

        let redirect = if network.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .connect_timeout(Duration::from_millis(network.connect_timeout_ms))
            .pool_max_idle_per_host(0)
            .user_agent(network.user_agent.clone())
            .redirect(redirect);

        if network.read_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(network.read_timeout_ms));
        }

        let client = builder
            .build()
            .map_err(|e| PodProbeError::Tls(render_chain(&e)))?;

        Ok(Self { client, recorder })
    }

    fn failure(err: reqwest::Error) -> TransportFailure {
        let message = render_chain(&err);
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            classify(&err)
        };
        tracing::debug!("transport failure ({:?}): {}", kind, message);
        TransportFailure::new(kind, message)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResponse, TransportFailure> {
        self.recorder.clear();

        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Post => self.client.post(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, crate::probe::MIME_JSON)
                .body(body.clone());
        }

        let response = builder.send().await.map_err(Self::failure)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let cert_chain = self.recorder.take();

        let body = response.text().await.map_err(Self::failure)?;

        Ok(RawResponse {
            status,
            content_type,
            body,
            cookies,
            cert_chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use url::Url;

    const CERT_PEM: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/localhost.crt"));
    const KEY_PEM: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/localhost.key"));

    /// Loopback HTTPS server answering `connections` requests with a small
    /// HTML page, one request per connection.
    fn serve_tls(connections: usize) -> u16 {
        let mut reader = CERT_PEM.as_bytes();
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let mut reader = KEY_PEM.as_bytes();
        let key = rustls_pemfile::private_key(&mut reader).unwrap().unwrap();
        let config = Arc::new(
            rustls::ServerConfig::builder_with_provider(default_provider())
                .with_safe_default_protocol_versions()
                .unwrap()
                .with_no_client_auth()
                .with_single_cert(certs, key)
                .unwrap(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let Ok(stream) = stream else { continue };
                let conn = rustls::ServerConnection::new(config.clone()).unwrap();
                let mut tls = rustls::StreamOwned::new(conn, stream);

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let _ = tls.write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                );
                tls.conn.send_close_notify();
                let _ = tls.flush();
            }
        });
        port
    }

    #[tokio::test]
    async fn test_every_request_records_the_server_chain() {
        let port = serve_tls(2);
        let transport = ReqwestTransport::new(&NetworkConfig::default(), None).unwrap();
        let request = ProbeRequest {
            method: Method::Get,
            url: Url::parse(&format!("https://127.0.0.1:{}/", port)).unwrap(),
            headers: Vec::new(),
            body: None,
        };

        // the second handshake must not resume the first session
        for attempt in 0..2 {
            let response = transport.send(&request).await.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "ok");
            assert_eq!(response.cert_chain.len(), 1, "attempt {}", attempt);
        }
    }

    #[test]
    fn test_builds_with_defaults() {
        let transport = ReqwestTransport::new(&NetworkConfig::default(), None);
        assert!(transport.is_ok());
    }

    #[test]
    fn test_builds_with_read_timeout_and_no_redirects() {
        let network = NetworkConfig {
            read_timeout_ms: 5000,
            follow_redirects: false,
            ..NetworkConfig::default()
        };
        assert!(ReqwestTransport::new(&network, None).is_ok());
    }
}
