//! TXT check: collect and categorize every TXT record at the apex.

use super::CheckContext;
use crate::types::{CheckStatus, TxtCategories, TxtReport};

/// Substrings that mark a TXT record as a site-verification token.
const VERIFICATION_MARKERS: [&str; 5] =
    ["verification", "verify", "google", "facebook", "microsoft"];

pub(crate) async fn check(ctx: &CheckContext) -> TxtReport {
    let records = match ctx.client.txt(ctx.domain.as_str()).await {
        Ok(records) => records,
        Err(err) if err.is_absent() => {
            return TxtReport {
                status: CheckStatus::Info,
                records: Vec::new(),
                categorized: TxtCategories::default(),
                issues: vec!["No TXT records found".to_string()],
                count: 0,
            };
        }
        Err(err) => {
            return TxtReport {
                status: CheckStatus::Error,
                records: Vec::new(),
                categorized: TxtCategories::default(),
                issues: vec![format!("Failed to query TXT records: {err}")],
                count: 0,
            };
        }
    };

    let categorized = categorize(&records);
    TxtReport {
        status: CheckStatus::Pass,
        count: records.len(),
        records,
        categorized,
        issues: Vec::new(),
    }
}

fn categorize(records: &[String]) -> TxtCategories {
    let mut categories = TxtCategories::default();
    for record in records {
        let lowered = record.to_lowercase();
        if lowered.starts_with("v=spf1") {
            categories.spf.push(record.clone());
        } else if lowered.starts_with("v=dmarc1") {
            categories.dmarc.push(record.clone());
        } else if lowered.contains("dkim") {
            categories.dkim.push(record.clone());
        } else if VERIFICATION_MARKERS.iter().any(|m| lowered.contains(m)) {
            categories.verification.push(record.clone());
        } else {
            categories.other.push(record.clone());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_buckets() {
        let records = vec![
            "v=spf1 -all".to_string(),
            "v=DMARC1; p=reject".to_string(),
            "v=DKIM1; k=rsa; p=MIGf".to_string(),
            "google-site-verification=abc123".to_string(),
            "hello world".to_string(),
        ];
        let categories = categorize(&records);
        assert_eq!(categories.spf.len(), 1);
        assert_eq!(categories.dmarc.len(), 1);
        assert_eq!(categories.dkim.len(), 1);
        assert_eq!(categories.verification.len(), 1);
        assert_eq!(categories.other.len(), 1);
    }

    #[test]
    fn test_categorize_is_case_insensitive() {
        let records = vec!["V=SPF1 include:x.example -all".to_string()];
        let categories = categorize(&records);
        assert_eq!(categories.spf.len(), 1);
    }

    #[test]
    fn test_categorize_empty() {
        let categories = categorize(&[]);
        assert!(categories.spf.is_empty());
        assert!(categories.other.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_txt_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert_eq!(report.status, CheckStatus::Pass);
        assert_eq!(report.count, report.records.len());
    }
}
