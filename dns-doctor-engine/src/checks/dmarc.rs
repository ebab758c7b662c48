//! DMARC check: policy record at `_dmarc.<domain>`.

use std::collections::BTreeMap;

use super::CheckContext;
use crate::types::{CheckStatus, DmarcReport};

pub(crate) async fn check(ctx: &CheckContext) -> DmarcReport {
    let dmarc_name = ctx.domain.sub("_dmarc");
    let records = match ctx.client.txt(&dmarc_name).await {
        Ok(records) => records,
        Err(err) if err.is_absent() => return missing(),
        Err(err) => {
            return DmarcReport {
                status: CheckStatus::Error,
                record: String::new(),
                parsed: BTreeMap::new(),
                issues: vec![format!("DMARC check failed: {err}")],
            };
        }
    };

    let Some(record) = records
        .iter()
        .find(|txt| txt.trim_start().to_lowercase().starts_with("v=dmarc1"))
        .cloned()
    else {
        return missing();
    };

    let parsed = parse_tags(&record);
    let mut issues = Vec::new();

    let policy = parsed.get("p").map_or("none", String::as_str);
    let status = match policy {
        "quarantine" | "reject" => CheckStatus::Pass,
        "none" => {
            issues.push(
                "DMARC policy is set to 'none'. Consider using 'quarantine' or 'reject' for \
                 better security."
                    .to_string(),
            );
            CheckStatus::Warning
        }
        other => {
            issues.push(format!("Invalid DMARC policy: {other}"));
            CheckStatus::Error
        }
    };

    if !parsed.contains_key("rua") {
        issues.push("No aggregate reporting address (rua) configured.".to_string());
    }

    DmarcReport {
        status,
        record,
        parsed,
        issues,
    }
}

fn missing() -> DmarcReport {
    DmarcReport {
        status: CheckStatus::Warning,
        record: String::new(),
        parsed: BTreeMap::new(),
        issues: vec![
            "No DMARC record found. Consider implementing DMARC for better email security."
                .to_string(),
        ],
    }
}

/// Split a `tag=value; tag=value` record into its pairs.
fn parse_tags(record: &str) -> BTreeMap<String, String> {
    record
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let parsed = parse_tags("v=DMARC1; p=reject; rua=mailto:dmarc@example.com");
        assert_eq!(parsed.get("v").unwrap(), "DMARC1");
        assert_eq!(parsed.get("p").unwrap(), "reject");
        assert_eq!(parsed.get("rua").unwrap(), "mailto:dmarc@example.com");
    }

    #[test]
    fn test_parse_tags_tolerates_whitespace_and_trailing_semicolon() {
        let parsed = parse_tags("v=DMARC1 ;  p = quarantine ;");
        assert_eq!(parsed.get("p").unwrap(), "quarantine");
    }

    #[test]
    fn test_parse_tags_ignores_malformed_parts() {
        let parsed = parse_tags("v=DMARC1; nonsense; p=none");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_missing_is_warning() {
        let report = missing();
        assert_eq!(report.status, CheckStatus::Warning);
        assert!(report.record.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dmarc_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert!(report.record.to_lowercase().starts_with("v=dmarc1"));
        assert!(report.parsed.contains_key("p"));
    }
}
