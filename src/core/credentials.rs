use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Session,
    KeyManager,
}

impl TokenKind {
    /// Request header carrying the token for header-authenticated APIs.
    pub fn header_name(&self) -> &'static str {
        match self {
            TokenKind::Session => "sessionToken",
            TokenKind::KeyManager => "keyManagerToken",
        }
    }

    /// Cookie carrying the token for browser-style endpoints.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            TokenKind::Session => "skey",
            TokenKind::KeyManager => "kmsession",
        }
    }
}

/// How a stage wants the known tokens presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStyle {
    #[default]
    None,
    Header,
    Cookie,
}

/// Tokens learned during the run, handed forward to later probes.
#[derive(Debug, Clone, Default)]
pub struct CredentialContext {
    session_token: Option<String>,
    key_manager_token: Option<String>,
}

impl CredentialContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a token. A later token of the same kind replaces the earlier
    /// one.
    pub fn record_token(&mut self, kind: TokenKind, value: impl Into<String>) {
        let slot = self.slot_mut(kind);
        if slot.is_some() {
            tracing::debug!("Replacing previously recorded {:?} token", kind);
        }
        *slot = Some(value.into());
    }

    pub fn token(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Session => self.session_token.as_deref(),
            TokenKind::KeyManager => self.key_manager_token.as_deref(),
        }
    }

    fn slot_mut(&mut self, kind: TokenKind) -> &mut Option<String> {
        match kind {
            TokenKind::Session => &mut self.session_token,
            TokenKind::KeyManager => &mut self.key_manager_token,
        }
    }

    fn known(&self) -> impl Iterator<Item = (TokenKind, &str)> {
        [TokenKind::Session, TokenKind::KeyManager]
            .into_iter()
            .filter_map(|kind| self.token(kind).map(|t| (kind, t)))
    }

    /// Attach every known token to an outgoing request's headers. With no
    /// tokens known nothing is added and the request goes out unauthenticated.
    pub fn apply_to(&self, style: AuthStyle, headers: &mut Vec<(String, String)>) {
        match style {
            AuthStyle::None => {}
            AuthStyle::Header => {
                for (kind, token) in self.known() {
                    headers.push((kind.header_name().to_string(), token.to_string()));
                }
            }
            AuthStyle::Cookie => {
                let cookie = self
                    .known()
                    .map(|(kind, token)| format!("{}={}", kind.cookie_name(), token))
                    .collect::<Vec<_>>()
                    .join(";");
                if !cookie.is_empty() {
                    headers.push(("Cookie".to_string(), cookie));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_adds_nothing() {
        let creds = CredentialContext::new();
        let mut headers = Vec::new();
        creds.apply_to(AuthStyle::Cookie, &mut headers);
        creds.apply_to(AuthStyle::Header, &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_cookie_style_joins_tokens() {
        let mut creds = CredentialContext::new();
        creds.record_token(TokenKind::Session, "s1");
        creds.record_token(TokenKind::KeyManager, "k1");

        let mut headers = Vec::new();
        creds.apply_to(AuthStyle::Cookie, &mut headers);
        assert_eq!(headers, vec![("Cookie".to_string(), "skey=s1;kmsession=k1".to_string())]);
    }

    #[test]
    fn test_header_style_and_overwrite() {
        let mut creds = CredentialContext::new();
        creds.record_token(TokenKind::Session, "old");
        creds.record_token(TokenKind::Session, "new");

        let mut headers = Vec::new();
        creds.apply_to(AuthStyle::Header, &mut headers);
        assert_eq!(headers, vec![("sessionToken".to_string(), "new".to_string())]);
        assert_eq!(creds.token(TokenKind::KeyManager), None);
    }

    #[test]
    fn test_none_style_ignores_tokens() {
        let mut creds = CredentialContext::new();
        creds.record_token(TokenKind::Session, "s1");
        let mut headers = Vec::new();
        creds.apply_to(AuthStyle::None, &mut headers);
        assert!(headers.is_empty());
    }
}
