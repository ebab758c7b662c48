//! CNAME check: aliases on common subdomains, and none at the apex.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};

use super::CheckContext;
use crate::domain::Domain;
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, CnameHost, CnameReport};

/// Subdomains commonly aliased to hosting providers.
const PROBED_SUBDOMAINS: [&str; 5] = ["www", "mail", "ftp", "blog", "shop"];

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> CnameReport {
    let client = &ctx.client;
    let records: BTreeMap<String, CnameHost> = stream::iter(
        PROBED_SUBDOMAINS.iter().map(ToString::to_string),
    )
    .map(|label: String| cname_pair(client, &ctx.domain, label))
        .buffered(FANOUT)
        .collect()
        .await;

    let mut issues = Vec::new();
    // RFC 1912 2.4: a CNAME at the zone apex conflicts with the mandatory
    // SOA and NS records there
    let apex_has_cname = matches!(
        client.cname(ctx.domain.as_str()).await,
        Ok(targets) if !targets.is_empty()
    );
    if apex_has_cname {
        issues.push("CNAME record found at zone apex (not allowed)".to_string());
    }

    let status = if apex_has_cname {
        CheckStatus::Error
    } else {
        CheckStatus::Pass
    };

    CnameReport {
        status,
        records,
        issues,
    }
}

async fn cname_pair(client: &DnsClient, domain: &Domain, label: &str) -> (String, CnameHost) {
    let host = domain.sub(label);
    (label.to_string(), cname_for_host(client, &host).await)
}

async fn cname_for_host(client: &DnsClient, host: &str) -> CnameHost {
    let target = match client.cname(host).await {
        Ok(targets) if !targets.is_empty() => targets[0].clone(),
        Ok(_) => {
            return CnameHost {
                status: CheckStatus::Info,
                target: String::new(),
                resolves: false,
                issues: Vec::new(),
            };
        }
        Err(err) if err.is_absent() => {
            return CnameHost {
                status: CheckStatus::Info,
                target: String::new(),
                resolves: false,
                issues: Vec::new(),
            };
        }
        Err(err) => {
            return CnameHost {
                status: CheckStatus::Error,
                target: String::new(),
                resolves: false,
                issues: vec![format!("Failed to query CNAME for {host}: {err}")],
            };
        }
    };

    let resolves = client.ipv4(&target).await.is_ok_and(|ips| !ips.is_empty())
        || client.ipv6(&target).await.is_ok_and(|ips| !ips.is_empty());

    CnameHost {
        status: if resolves {
            CheckStatus::Pass
        } else {
            CheckStatus::Warning
        },
        issues: if resolves {
            Vec::new()
        } else {
            vec![format!("CNAME target {target} does not resolve")]
        },
        target,
        resolves,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::tld::TldRegistry;
    use std::sync::Arc;

    #[test]
    fn test_probed_subdomains_are_fixed() {
        assert_eq!(PROBED_SUBDOMAINS, ["www", "mail", "ftp", "blog", "shop"]);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_cname_check_real() {
        let ctx = CheckContext {
            domain: Domain::parse("example.com").unwrap(),
            client: Arc::new(DnsClient::new()),
            registry: Arc::new(TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        // example.com has no apex CNAME
        assert_ne!(report.status, CheckStatus::Error);
        assert_eq!(report.records.len(), PROBED_SUBDOMAINS.len());
        for label in PROBED_SUBDOMAINS {
            assert!(report.records.contains_key(label));
        }
    }
}
