//! GLUE check: in-bailiwick nameservers must have glue at the parent.
//!
//! Depends on NS. The parent delegation (and the recursive NS set) is
//! re-queried privately when the NS check was not requested; the result
//! never reaches the top-level report.

use super::CheckContext;
use crate::delegation;
use crate::types::{CheckStatus, GlueEntry, GlueReport};

pub(crate) async fn check(ctx: &CheckContext) -> GlueReport {
    let parent = delegation::probe(&ctx.domain, &ctx.registry, &ctx.client).await;

    if parent.records.is_empty() {
        // Without delegation data there is no glue to judge
        return GlueReport {
            status: CheckStatus::Error,
            records: Vec::new(),
            issues: vec![format!(
                "Cannot check glue records: {}",
                parent
                    .error
                    .unwrap_or_else(|| "parent delegation unavailable".to_string())
            )],
        };
    }

    // Union of parent-delegated and recursively-visible nameservers
    let mut hosts: Vec<String> = parent.records.clone();
    if let Ok((domain_hosts, _ttl)) = ctx.client.ns(ctx.domain.as_str()).await {
        for host in domain_hosts {
            let host = host.to_ascii_lowercase();
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
    }

    let mut records = Vec::new();
    let mut issues = Vec::new();
    for host in hosts {
        let needs_glue = ctx.domain.is_in_bailiwick(&host);
        let glue_records = parent.glue.get(&host).cloned().unwrap_or_default();
        let has_glue = !glue_records.is_empty();
        if needs_glue && !has_glue {
            issues.push(format!("Nameserver {host} needs glue records but none found"));
        }
        records.push(GlueEntry {
            nameserver: host,
            needs_glue,
            has_glue,
            glue_records,
        });
    }

    let missing_required = records.iter().any(|r| r.needs_glue && !r.has_glue);
    let status = if missing_required {
        CheckStatus::Error
    } else {
        CheckStatus::Pass
    };

    GlueReport {
        status,
        records,
        issues,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn test_glue_entry_rules() {
        // Out-of-bailiwick nameserver without glue is fine
        let domain = Domain::parse("example.com").unwrap();
        assert!(domain.is_in_bailiwick("ns1.example.com"));
        assert!(!domain.is_in_bailiwick("ns1.dnsprovider.net"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_glue_check_real() {
        let ctx = CheckContext {
            domain: Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::builtin()),
        };
        let report = check(&ctx).await;
        // ns1-4.google.com are in-bailiwick and glued at the gTLD servers
        assert_eq!(report.status, CheckStatus::Pass);
        assert!(report.records.iter().any(|r| r.needs_glue && r.has_glue));
    }
}
