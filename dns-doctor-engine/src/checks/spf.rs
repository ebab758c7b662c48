//! SPF check: sender-policy record presence and syntax.

use super::CheckContext;
use crate::types::{CheckStatus, SpfReport};

/// RFC 7208 4.6.4 caps DNS-lookup mechanisms at ten.
const MAX_DNS_LOOKUPS: u32 = 10;

pub(crate) async fn check(ctx: &CheckContext) -> SpfReport {
    let txt_records = match ctx.client.txt(ctx.domain.as_str()).await {
        Ok(records) => records,
        Err(err) if err.is_absent() => Vec::new(),
        Err(err) => {
            return SpfReport {
                status: CheckStatus::Error,
                record: String::new(),
                issues: vec![format!("Failed to query SPF record: {err}")],
                dns_lookups: None,
            };
        }
    };

    let spf_records: Vec<&String> = txt_records
        .iter()
        .filter(|txt| txt.starts_with("v=spf1"))
        .collect();

    if spf_records.is_empty() {
        return SpfReport {
            status: CheckStatus::Info,
            record: String::new(),
            issues: vec!["No SPF record found".to_string()],
            dns_lookups: None,
        };
    }

    let mut issues = Vec::new();
    if spf_records.len() > 1 {
        issues.push("Multiple SPF records found (only one allowed)".to_string());
    }

    let record = spf_records[0].clone();
    if !has_valid_all_qualifier(&record) {
        issues.push("Invalid SPF syntax".to_string());
    }

    let lookups = count_dns_lookups(&record);
    if lookups > MAX_DNS_LOOKUPS {
        issues.push(format!(
            "Too many DNS lookups in SPF ({lookups}/{MAX_DNS_LOOKUPS})"
        ));
    }

    if record.to_lowercase().split_whitespace().any(|term| {
        term == "ptr" || term.starts_with("ptr:") || term.starts_with("+ptr")
    }) {
        issues.push("SPF contains deprecated 'ptr' mechanism".to_string());
    }

    let status = if issues.is_empty() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };

    SpfReport {
        status,
        record,
        issues,
        dns_lookups: Some(lookups),
    }
}

/// A policy must end in an `all` directive with an explicit qualifier.
fn has_valid_all_qualifier(record: &str) -> bool {
    matches!(
        record.split_whitespace().last(),
        Some("~all" | "-all" | "+all" | "?all")
    )
}

/// Count the mechanisms that cost a DNS lookup at evaluation time.
fn count_dns_lookups(record: &str) -> u32 {
    let lowered = record.to_lowercase();
    let mut count = 0u32;
    for mechanism in ["include:", "a:", "mx:", "exists:", "redirect="] {
        count += u32::try_from(lowered.matches(mechanism).count()).unwrap_or(u32::MAX);
    }
    for term in lowered.split_whitespace() {
        let term = term.trim_start_matches(['+', '-', '~', '?']);
        if term == "a" || term == "mx" {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_all_qualifiers() {
        assert!(has_valid_all_qualifier("v=spf1 -all"));
        assert!(has_valid_all_qualifier("v=spf1 include:_spf.google.com ~all"));
        assert!(has_valid_all_qualifier("v=spf1 +all"));
        assert!(has_valid_all_qualifier("v=spf1 ?all"));
    }

    #[test]
    fn test_missing_all_qualifier() {
        assert!(!has_valid_all_qualifier("v=spf1 include:_spf.google.com"));
        assert!(!has_valid_all_qualifier("v=spf1 all"));
        assert!(!has_valid_all_qualifier(""));
    }

    #[test]
    fn test_count_dns_lookups_strict_policy() {
        assert_eq!(count_dns_lookups("v=spf1 -all"), 0);
    }

    #[test]
    fn test_count_dns_lookups_mechanisms() {
        assert_eq!(
            count_dns_lookups("v=spf1 include:_spf.google.com include:other.example ~all"),
            2
        );
        assert_eq!(count_dns_lookups("v=spf1 a mx -all"), 2);
        assert_eq!(count_dns_lookups("v=spf1 a:mail.example.com mx:mx.example.com -all"), 2);
        assert_eq!(
            count_dns_lookups("v=spf1 exists:%{i}.spf.example.com redirect=_spf.example.com"),
            2
        );
    }

    #[test]
    fn test_count_dns_lookups_qualified_bare_mechanisms() {
        assert_eq!(count_dns_lookups("v=spf1 +a ~mx -all"), 2);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_spf_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert!(report.record.starts_with("v=spf1"));
        assert!(report.dns_lookups.is_some());
    }
}
