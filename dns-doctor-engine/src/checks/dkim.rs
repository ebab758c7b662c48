//! DKIM check: probe well-known selectors under `_domainkey`.
//!
//! The selector list is heuristic. A negative result only means no
//! well-known selector was found, not that the domain publishes no DKIM key.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};

use super::CheckContext;
use crate::domain::Domain;
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, DkimReport, DkimSelectorRecord};

/// Selectors commonly used by mail providers.
const PROBED_SELECTORS: [&str; 14] = [
    "default",
    "selector1",
    "selector2",
    "google",
    "k1",
    "s1",
    "s2",
    "dkim",
    "mail",
    "email",
    "smtp",
    "mx",
    "key1",
    "key2",
];

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> DkimReport {
    let client = &ctx.client;
    let domain = &ctx.domain;

    let mut records: Vec<DkimSelectorRecord> = stream::iter(PROBED_SELECTORS)
        .map(|selector: &str| probe_selector_for(client, domain, selector))
        .buffered(FANOUT)
        .filter_map(std::future::ready)
        .collect()
        .await;
    records.sort_by(|a, b| a.selector.cmp(&b.selector));

    if records.is_empty() {
        return DkimReport {
            status: CheckStatus::Warning,
            records: Vec::new(),
            issues: vec![
                "No DKIM records found at well-known selectors. Consider implementing DKIM for \
                 better email authentication."
                    .to_string(),
            ],
        };
    }

    let mut issues = Vec::new();
    for record in &records {
        if record.parsed.get("p").is_none_or(String::is_empty) {
            issues.push(format!(
                "DKIM selector '{}' is missing public key (p=)",
                record.selector
            ));
        }
        if let Some(key_type) = record.parsed.get("k") {
            if key_type != "rsa" && key_type != "ed25519" {
                issues.push(format!(
                    "DKIM selector '{}' uses unsupported key type: {key_type}",
                    record.selector
                ));
            }
        }
    }

    DkimReport {
        status: if issues.is_empty() {
            CheckStatus::Pass
        } else {
            CheckStatus::Warning
        },
        records,
        issues,
    }
}

async fn probe_selector_for(client: &DnsClient, domain: &Domain, selector: &str) -> Option<DkimSelectorRecord> {
    let name = domain.sub(&format!("{selector}._domainkey"));
    probe_selector(client, &name, selector).await
}

async fn probe_selector(
    client: &DnsClient,
    name: &str,
    selector: &str,
) -> Option<DkimSelectorRecord> {
    let records = client.txt(name).await.ok()?;
    let record = records
        .into_iter()
        .find(|txt| txt.contains("p=") || txt.contains("k="))?;
    let parsed = parse_tags(&record);
    Some(DkimSelectorRecord {
        selector: selector.to_string(),
        record,
        parsed,
    })
}

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
    fn test_selector_list_matches_probe_set() {
        assert_eq!(PROBED_SELECTORS.len(), 14);
        assert!(PROBED_SELECTORS.contains(&"default"));
        assert!(PROBED_SELECTORS.contains(&"google"));
        assert!(PROBED_SELECTORS.contains(&"selector1"));
    }

    #[test]
    fn test_parse_tags_dkim_record() {
        let parsed = parse_tags("v=DKIM1; k=rsa; p=MIGfMA0GCSq");
        assert_eq!(parsed.get("k").unwrap(), "rsa");
        assert_eq!(parsed.get("p").unwrap(), "MIGfMA0GCSq");
    }

    #[test]
    fn test_parse_tags_revoked_key_keeps_empty_value() {
        let parsed = parse_tags("v=DKIM1; k=rsa; p=");
        assert_eq!(parsed.get("p").unwrap(), "");
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dkim_check_real_google() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("gmail.com").unwrap(),
            client: std::sync::Arc::new(DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        // gmail.com publishes a key under a well-known selector
        assert!(!report.records.is_empty());
    }
}
