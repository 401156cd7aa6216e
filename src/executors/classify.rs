//! Maps whatever the HTTP/TLS stack reports into a [`FailureKind`].
//!
//! Detecting "the server wants a client certificate" depends entirely on how
//! the TLS library surfaces handshake alerts, so all of that knowledge lives
//! here. Typed errors are inspected first; the rendered message is the
//! fallback.

use std::error::Error;
use std::io;

use rustls::AlertDescription;

use super::transport::FailureKind;

const CERT_AUTH_MARKERS: &[&str] = &[
    "bad_certificate",
    "badcertificate",
    "certificate_unknown",
    "certificateunknown",
    "certificate_required",
    "certificaterequired",
];

const UNKNOWN_HOST_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
];

const TLS_MARKERS: &[&str] = &["tls", "ssl", "handshake", "certificate", "alert"];

pub fn classify(err: &(dyn Error + 'static)) -> FailureKind {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(kind) = classify_typed(e) {
            return kind;
        }
        current = e.source();
    }

    classify_message(&render_chain(err))
}

fn classify_typed(e: &(dyn Error + 'static)) -> Option<FailureKind> {
    if let Some(tls) = e.downcast_ref::<rustls::Error>() {
        return Some(classify_tls(tls));
    }

    if let Some(io_err) = e.downcast_ref::<io::Error>() {
        // io::Error::source() skips the wrapped error, so look inside
        if let Some(tls) = io_err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
            return Some(classify_tls(tls));
        }
        match io_err.kind() {
            io::ErrorKind::ConnectionRefused => return Some(FailureKind::Refused),
            io::ErrorKind::TimedOut => return Some(FailureKind::Timeout),
            _ => {}
        }
    }

    None
}

fn classify_tls(err: &rustls::Error) -> FailureKind {
    match err {
        rustls::Error::AlertReceived(
            AlertDescription::BadCertificate
            | AlertDescription::CertificateUnknown
            | AlertDescription::CertificateRequired,
        ) => FailureKind::CertAuthRequired,
        _ => FailureKind::Tls,
    }
}

pub fn classify_message(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(CERT_AUTH_MARKERS) {
        FailureKind::CertAuthRequired
    } else if has(UNKNOWN_HOST_MARKERS) {
        FailureKind::UnknownHost
    } else if lower.contains("connection refused") {
        FailureKind::Refused
    } else if lower.contains("timed out") || lower.contains("timeout") {
        FailureKind::Timeout
    } else if has(TLS_MARKERS) {
        FailureKind::Tls
    } else {
        FailureKind::Other
    }
}

/// `outer: inner: innermost`, for diagnostics and message matching.
pub fn render_chain(err: &(dyn Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
