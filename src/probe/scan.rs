use url::Url;

use super::Probe;

/// What a batch of probes for one objective boils down to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A probe fully succeeded.
    Valid(Url),
    /// Nothing succeeded, but exactly one endpoint demanded a client
    /// certificate: it is very likely the one we are after.
    Probable(Url),
    /// Several endpoints demanded a client certificate; no winner is picked.
    Ambiguous(Vec<Url>),
    NotFound,
}

/// All probes attempted for one objective, in cross-product order.
#[derive(Debug, Clone)]
pub struct ScanResponse {
    name: String,
    probes: Vec<Probe>,
}

impl ScanResponse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, probe: Probe) {
        self.probes.push(probe);
    }

    /// The first probe that succeeded. Later successes are not authoritative.
    pub fn valid_probe(&self) -> Option<&Probe> {
        self.probes.iter().find(|p| !p.is_failed())
    }

    pub fn has_valid_probe(&self) -> bool {
        self.valid_probe().is_some()
    }

    /// Endpoints that exist but want a client certificate. Only meaningful,
    /// and only non-empty, when there is no valid probe.
    pub fn cert_auth_probes(&self) -> Vec<&Probe> {
        if self.has_valid_probe() {
            return Vec::new();
        }
        self.probes.iter().filter(|p| p.is_failed_cert_auth()).collect()
    }

    /// A tag extracted by the valid probe.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.valid_probe().and_then(|p| p.tag(name))
    }

    pub fn resolve(&self) -> Resolution {
        if let Some(probe) = self.valid_probe() {
            return Resolution::Valid(probe.base_url().clone());
        }

        let mut candidates: Vec<Url> = self
            .cert_auth_probes()
            .into_iter()
            .map(|p| p.base_url().clone())
            .collect();

        match candidates.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Probable(candidates.remove(0)),
            _ => Resolution::Ambiguous(candidates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::HostTarget;

    fn probe(suffix: &str, port: u16) -> Probe {
        Probe::new(&HostTarget::new("acme", ".symphony.com"), suffix, port, "/sessionauth").unwrap()
    }

    #[test]
    fn test_empty_response_resolves_to_not_found() {
        let response = ScanResponse::new("Session Auth");
        assert!(response.valid_probe().is_none());
        assert!(response.cert_auth_probes().is_empty());
        assert_eq!(response.resolve(), Resolution::NotFound);
    }

    #[test]
    fn test_first_success_wins() {
        let mut response = ScanResponse::new("Session Auth");

        let mut first = probe("-api", 8444);
        first.fail_cert_auth("bad_certificate");
        let mut second = probe("-api", 8445);
        second.record_tag("token", "a".to_string());
        second.succeed();
        let mut third = probe("-api", 8446);
        third.record_tag("token", "b".to_string());
        third.succeed();

        response.add(first);
        response.add(second);
        response.add(third);

        assert_eq!(response.valid_probe().unwrap().port(), 8445);
        assert_eq!(response.tag("token"), Some("a"));
        // a valid probe hides cert-auth candidates
        assert!(response.cert_auth_probes().is_empty());
        assert_eq!(
            response.resolve(),
            Resolution::Valid(Url::parse("https://acme-api.symphony.com:8445/sessionauth").unwrap())
        );
    }

    #[test]
    fn test_single_cert_auth_candidate_is_probable() {
        let mut response = ScanResponse::new("Key Auth");
        let mut p = probe("", 8444);
        p.fail_cert_auth("bad_certificate");
        response.add(p);
        let mut p = probe("", 8445);
        p.fail("connection refused");
        response.add(p);

        assert_eq!(
            response.resolve(),
            Resolution::Probable(Url::parse("https://acme.symphony.com:8444/sessionauth").unwrap())
        );
        assert_eq!(response.tag("token"), None);
    }

    #[test]
    fn test_many_cert_auth_candidates_are_ambiguous() {
        let mut response = ScanResponse::new("Session Auth");
        for suffix in ["-api", ""] {
            for port in [8444, 8445, 8446] {
                let mut p = probe(suffix, port);
                p.fail_cert_auth("bad_certificate");
                response.add(p);
            }
        }

        assert_eq!(response.cert_auth_probes().len(), 6);
        match response.resolve() {
            Resolution::Ambiguous(urls) => assert_eq!(urls.len(), 6),
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }
}
