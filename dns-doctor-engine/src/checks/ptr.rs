//! PTR check: reverse DNS for every mail exchanger address.
//!
//! Depends on MX. When the MX check was not requested, the MX lookup is
//! re-run privately here; its result never reaches the top-level report.

use std::net::IpAddr;

use futures::stream::{self, StreamExt};

use super::{mx, CheckContext};
use crate::resolver::DnsClient;
use crate::types::{AddrKind, CheckStatus, PtrEntry, PtrReport};

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> PtrReport {
    let mx_report = mx::check(ctx).await;

    if mx_report.status == CheckStatus::Error || mx_report.records.is_empty() {
        return PtrReport {
            status: CheckStatus::Info,
            records: Vec::new(),
            issues: vec!["No MX records to check PTR for".to_string()],
        };
    }

    let client = &ctx.client;
    let targets: Vec<(String, String)> = mx_report
        .records
        .iter()
        .flat_map(|mx| {
            mx.ips
                .iter()
                .filter(|ip| ip.kind == AddrKind::V4)
                .map(|ip| (ip.address.clone(), mx.host.clone()))
        })
        .collect();

    let records: Vec<PtrEntry> = stream::iter(targets)
        .map(|(ip, mx_host)| async move { ptr_for_ip(client, ip, mx_host).await })
        .buffered(FANOUT)
        .collect()
        .await;

    let failed = records
        .iter()
        .filter(|entry| entry.status == CheckStatus::Error)
        .count();
    let mismatched = records
        .iter()
        .any(|entry| entry.status == CheckStatus::Warning);

    let mut issues = Vec::new();
    if failed > 0 {
        issues.push(format!("{failed} MX servers missing PTR records"));
    }

    let status = if failed > 0 || mismatched {
        CheckStatus::Warning
    } else {
        CheckStatus::Pass
    };

    PtrReport {
        status,
        records,
        issues,
    }
}

async fn ptr_for_ip(client: &DnsClient, ip: String, mx_host: String) -> PtrEntry {
    let Ok(addr) = ip.parse::<IpAddr>() else {
        return PtrEntry {
            issues: vec![format!("Invalid MX address: {ip}")],
            ip,
            mx_host,
            status: CheckStatus::Error,
            ptr: None,
            matches_mx: false,
        };
    };

    match client.reverse(addr).await {
        Ok(names) if !names.is_empty() => {
            let ptr = names[0].clone();
            let matches_mx = ptr.eq_ignore_ascii_case(&mx_host);
            PtrEntry {
                status: if matches_mx {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Warning
                },
                issues: if matches_mx {
                    Vec::new()
                } else {
                    vec![format!("PTR {ptr} does not match MX host {mx_host}")]
                },
                ip,
                mx_host,
                ptr: Some(ptr),
                matches_mx,
            }
        }
        Ok(_) => PtrEntry {
            issues: vec![format!("No PTR record for {ip}")],
            ip,
            mx_host,
            status: CheckStatus::Error,
            ptr: None,
            matches_mx: false,
        },
        Err(err) => PtrEntry {
            issues: vec![format!("No PTR record for {ip}: {err}")],
            ip,
            mx_host,
            status: CheckStatus::Error,
            ptr: None,
            matches_mx: false,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_ip_yields_error_entry() {
        let client = DnsClient::new();
        let entry = ptr_for_ip(&client, "not-an-ip".to_string(), "mx.example.com".to_string()).await;
        assert_eq!(entry.status, CheckStatus::Error);
        assert!(!entry.matches_mx);
        assert!(entry.ptr.is_none());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_ptr_for_known_resolver() {
        let client = DnsClient::new();
        let entry = ptr_for_ip(&client, "8.8.8.8".to_string(), "dns.google".to_string()).await;
        assert_eq!(entry.status, CheckStatus::Pass);
        assert!(entry.matches_mx);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_ptr_check_runs_mx_prerequisite() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert!(!report.records.is_empty());
        for entry in &report.records {
            assert!(entry.ip.parse::<std::net::Ipv4Addr>().is_ok());
        }
    }
}
