pub mod args;

use anyhow::Result;

use crate::core::models::HostTarget;

/// Turn the `--target` argument into a host to probe. The name is everything
/// before the first '.', the domain everything from it; a bare name gets
/// `default_domain`.
pub fn parse_host(input: &str, default_domain: &str) -> Result<HostTarget> {
    let host = input.trim().trim_end_matches('.').to_ascii_lowercase();

    if host.is_empty() {
        anyhow::bail!("Target host name is empty");
    }
    if host.starts_with('.') {
        anyhow::bail!("Invalid target host name: {}", input);
    }
    if let Some(bad) = host
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
    {
        anyhow::bail!("Invalid character {:?} in target host name: {}", bad, input);
    }

    Ok(HostTarget::split(&host, default_domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_gets_default_domain() {
        let host = parse_host("acme", ".symphony.com").unwrap();
        assert_eq!(host.fqdn(), "acme.symphony.com");
        assert_eq!(host.name, "acme");
    }

    #[test]
    fn test_fqdn_is_split_at_first_dot() {
        let host = parse_host("Acme.Example.COM.", ".symphony.com").unwrap();
        assert_eq!(host.name, "acme");
        assert_eq!(host.domain, ".example.com");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_host("", ".symphony.com").is_err());
        assert!(parse_host(".acme", ".symphony.com").is_err());
        assert!(parse_host("https://acme.symphony.com", ".symphony.com").is_err());
    }
}
