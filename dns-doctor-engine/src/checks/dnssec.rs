//! DNSSEC check: deployment detection only.
//!
//! Looks for DS (published at the parent), DNSKEY and RRSIG (published by
//! the zone). Signatures are never validated cryptographically.

use futures::join;
use hickory_resolver::proto::rr::RecordType;

use super::CheckContext;
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, DnssecRecordPresence, DnssecReport};

pub(crate) async fn check(ctx: &CheckContext) -> DnssecReport {
    let name = ctx.domain.as_str();
    let (ds, dnskey, rrsig) = join!(
        presence(&ctx.client, name, RecordType::DS),
        presence(&ctx.client, name, RecordType::DNSKEY),
        presence(&ctx.client, name, RecordType::RRSIG)
    );

    let mut records = Vec::new();
    let mut issues = Vec::new();

    match ds {
        Some(found) => {
            issues.push("DS records found at parent zone".to_string());
            records.extend(found);
        }
        None => issues.push("No DS records found at parent zone".to_string()),
    }
    match dnskey {
        Some(found) => {
            issues.push("DNSKEY records found".to_string());
            records.extend(found);
        }
        None => issues.push("No DNSKEY records found".to_string()),
    }
    match rrsig {
        Some(found) => {
            issues.push(format!("Found {} RRSIG records", found.len()));
        }
        None => issues.push("No RRSIG records found".to_string()),
    }

    let status = if records.is_empty() {
        issues.push("DNSSEC is not configured for this domain".to_string());
        CheckStatus::Warning
    } else {
        issues.push("DNSSEC appears to be configured".to_string());
        CheckStatus::Pass
    };

    DnssecReport {
        status,
        records,
        issues,
    }
}

/// Query one DNSSEC rrtype; `None` when nothing is published.
async fn presence(
    client: &DnsClient,
    name: &str,
    rtype: RecordType,
) -> Option<Vec<DnssecRecordPresence>> {
    let records = client.lookup_raw(name, rtype).await.ok()?;
    let found: Vec<DnssecRecordPresence> = records
        .iter()
        .filter(|record| record.record_type() == rtype)
        .map(|record| DnssecRecordPresence {
            kind: rtype.to_string(),
            record: record.data().to_string(),
            ttl: record.ttl(),
        })
        .collect();
    (!found.is_empty()).then_some(found)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::tld::TldRegistry;
    use std::sync::Arc;

    fn ctx(domain: &str) -> CheckContext {
        CheckContext {
            domain: Domain::parse(domain).unwrap(),
            client: Arc::new(DnsClient::new()),
            registry: Arc::new(TldRegistry::empty()),
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dnssec_check_signed_zone() {
        // cloudflare.com deploys DNSSEC
        let report = check(&ctx("cloudflare.com")).await;
        assert_eq!(report.status, CheckStatus::Pass);
        assert!(report.records.iter().any(|r| r.kind == "DNSKEY"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dnssec_check_unsigned_zone() {
        // google.com famously does not sign
        let report = check(&ctx("google.com")).await;
        assert_eq!(report.status, CheckStatus::Warning);
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("not configured")));
    }
}
