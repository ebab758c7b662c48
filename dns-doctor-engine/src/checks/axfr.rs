//! AXFR check: zone-transfer exposure.
//!
//! Depends on NS; re-resolves the nameserver set privately when needed. A
//! nameserver that hands the whole zone to a stranger leaks every record.

use std::net::IpAddr;

use futures::stream::{self, StreamExt};

use super::CheckContext;
use crate::types::{AxfrReport, AxfrServer, CheckStatus};

/// Concurrent transfer attempts.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> AxfrReport {
    let Ok((hosts, _ttl)) = ctx.client.ns(ctx.domain.as_str()).await else {
        return AxfrReport {
            status: CheckStatus::Error,
            open: false,
            servers: Vec::new(),
            issues: vec!["Cannot check AXFR: NS record check failed".to_string()],
        };
    };

    let client = &ctx.client;
    let domain = &ctx.domain;
    let servers: Vec<AxfrServer> = stream::iter(hosts)
        .map(|host| async move {
            let ips = client.ipv4(&host).await.unwrap_or_default();
            let mut results = Vec::new();
            for ip in ips {
                let vulnerable = client
                    .zone_transfer(IpAddr::V4(ip), domain.as_str())
                    .await
                    .is_ok();
                results.push(AxfrServer {
                    nameserver: host.clone(),
                    ip: ip.to_string(),
                    vulnerable,
                });
            }
            results
        })
        .buffered(FANOUT)
        .collect::<Vec<Vec<AxfrServer>>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    let open = servers.iter().any(|s| s.vulnerable);
    let mut issues: Vec<String> = servers
        .iter()
        .filter(|s| s.vulnerable)
        .map(|s| format!("Zone transfer allowed from {} ({})", s.nameserver, s.ip))
        .collect();

    let status = if open {
        issues.insert(
            0,
            "Zone transfer vulnerability detected! This allows unauthorized access to DNS \
             records."
                .to_string(),
        );
        CheckStatus::Error
    } else {
        issues.push("Zone transfers are properly restricted on all nameservers.".to_string());
        CheckStatus::Pass
    };

    AxfrReport {
        status,
        open,
        servers,
        issues,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_axfr_check_locked_down_zone() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert_eq!(report.status, CheckStatus::Pass);
        assert!(!report.open);
        assert!(report.servers.iter().all(|s| !s.vulnerable));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_axfr_check_open_test_zone() {
        // zonetransfer.me is intentionally transferable
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("zonetransfer.me").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert_eq!(report.status, CheckStatus::Error);
        assert!(report.open);
    }
}
