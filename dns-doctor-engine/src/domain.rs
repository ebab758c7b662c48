//! Domain name validation and decomposition.

use std::fmt;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// A validated, normalized domain name.
///
/// Always lowercase, without a trailing dot, at most 253 characters, with
/// every label 1-63 characters of `[a-z0-9-]` where hyphens are neither
/// leading nor trailing (RFC 1035 / RFC 1123).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Validate and normalize a raw domain string.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();

        if name.is_empty() {
            return Err(EngineError::InvalidDomain(
                "Domain name is required".to_string(),
            ));
        }
        if name.len() > 253 {
            return Err(EngineError::InvalidDomain(format!(
                "Domain name exceeds maximum length of 253 characters (got {})",
                name.len()
            )));
        }
        let labels: Vec<&str> = name.split('.').collect();
        if labels.len() < 2 {
            return Err(EngineError::InvalidDomain(format!(
                "Domain must contain at least two labels: {name}"
            )));
        }
        for label in &labels {
            validate_label(label, &name)?;
        }

        Ok(Self(name))
    }

    /// The normalized name, without trailing dot.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The top-level label (`"com"` for `"example.com"`).
    pub fn tld(&self) -> &str {
        // parse() guarantees at least two labels, so rsplit always yields one
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Prefix the domain with a subdomain label (`sub("www")` -> `www.example.com`).
    pub fn sub(&self, label: &str) -> String {
        format!("{label}.{}", self.0)
    }

    /// True when `host` lies inside this domain's zone (needs glue at the parent).
    pub fn is_in_bailiwick(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.0 || host.ends_with(&format!(".{}", self.0))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_label(label: &str, name: &str) -> EngineResult<()> {
    if label.is_empty() {
        return Err(EngineError::InvalidDomain(format!(
            "Empty label in domain: {name}"
        )));
    }
    if label.len() > 63 {
        return Err(EngineError::InvalidDomain(format!(
            "Label exceeds 63 characters in domain: {name}"
        )));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(EngineError::InvalidDomain(format!(
            "Label may not start or end with a hyphen: {label}"
        )));
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(EngineError::InvalidDomain(format!(
            "Label contains invalid characters: {label}"
        )));
    }
    Ok(())
}

/// Validate an arbitrary hostname (RFC 1123 syntax) without normalizing it.
///
/// Used for names the analysis discovers (NS targets, MX exchanges) rather
/// than names the user supplied.
pub fn is_valid_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_trailing_dot() {
        let d = Domain::parse("Example.COM.").unwrap();
        assert_eq!(d.as_str(), "example.com");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let d = Domain::parse("  example.com  ").unwrap();
        assert_eq!(d.as_str(), "example.com");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            Domain::parse(""),
            Err(EngineError::InvalidDomain(_))
        ));
        assert!(matches!(
            Domain::parse("   "),
            Err(EngineError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_parse_rejects_single_label() {
        assert!(matches!(
            Domain::parse("localhost"),
            Err(EngineError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_parse_rejects_leading_hyphen_label() {
        assert!(matches!(
            Domain::parse("-bad.example.com"),
            Err(EngineError::InvalidDomain(_))
        ));
        assert!(matches!(
            Domain::parse("bad-.example.com"),
            Err(EngineError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_characters() {
        assert!(Domain::parse("under_score.example.com").is_err());
        assert!(Domain::parse("spa ce.example.com").is_err());
        assert!(Domain::parse("exclaim!.example.com").is_err());
    }

    #[test]
    fn test_parse_accepts_253_chars_rejects_254() {
        // 63 + 1 + 63 + 1 + 63 + 1 + 61 = 253
        let domain_253 = format!(
            "{}.{}.{}.{}",
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(61)
        );
        assert_eq!(domain_253.len(), 253);
        assert!(Domain::parse(&domain_253).is_ok());

        let domain_254 = format!(
            "{}.{}.{}.{}",
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(62)
        );
        assert_eq!(domain_254.len(), 254);
        assert!(Domain::parse(&domain_254).is_err());
    }

    #[test]
    fn test_parse_rejects_overlong_label() {
        let domain = format!("{}.com", "a".repeat(64));
        assert!(Domain::parse(&domain).is_err());
    }

    #[test]
    fn test_tld_extraction() {
        let d = Domain::parse("www.example.co.uk").unwrap();
        assert_eq!(d.tld(), "uk");
        let d = Domain::parse("example.com").unwrap();
        assert_eq!(d.tld(), "com");
    }

    #[test]
    fn test_sub() {
        let d = Domain::parse("example.com").unwrap();
        assert_eq!(d.sub("www"), "www.example.com");
        assert_eq!(d.sub("_dmarc"), "_dmarc.example.com");
    }

    #[test]
    fn test_is_in_bailiwick() {
        let d = Domain::parse("example.com").unwrap();
        assert!(d.is_in_bailiwick("ns1.example.com"));
        assert!(d.is_in_bailiwick("ns1.example.com."));
        assert!(d.is_in_bailiwick("example.com"));
        assert!(!d.is_in_bailiwick("ns1.example.net"));
        assert!(!d.is_in_bailiwick("badexample.com"));
    }

    #[test]
    fn test_is_valid_hostname() {
        assert!(is_valid_hostname("ns1.example.com"));
        assert!(is_valid_hostname("ns1.example.com."));
        assert!(is_valid_hostname("A.ROOT-SERVERS.NET"));
        assert!(!is_valid_hostname("ns_1.example.com"));
        assert!(!is_valid_hostname("-ns.example.com"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname(&format!("{}.com", "a".repeat(64))));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let d = Domain::parse("example.com").unwrap();
        assert_eq!(serde_json::to_value(&d).unwrap(), "example.com");
    }
}
