//! A and AAAA checks for the apex and `www`.

use futures::join;

use super::{support, CheckContext};
use crate::resolver::DnsClient;
use crate::types::{AddressRecords, AddressReport, CheckStatus, HostAddresses};

pub(crate) async fn check_a(ctx: &CheckContext) -> AddressReport {
    let www = ctx.domain.sub("www");
    let (root, www) = join!(
        a_for_host(&ctx.client, ctx.domain.as_str()),
        a_for_host(&ctx.client, &www)
    );

    let mut issues = Vec::new();
    if root.status != CheckStatus::Pass {
        issues.push("No A record for root domain".to_string());
    }
    if www.status != CheckStatus::Pass {
        issues.push("No A record for www subdomain".to_string());
    }

    // A missing apex A record is advisory; plenty of zones are mail-only
    let status = if root.status == CheckStatus::Pass {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };

    AddressReport {
        status,
        records: AddressRecords { root, www },
        issues,
    }
}

pub(crate) async fn check_aaaa(ctx: &CheckContext) -> AddressReport {
    let www = ctx.domain.sub("www");
    let (root, www) = join!(
        aaaa_for_host(&ctx.client, ctx.domain.as_str()),
        aaaa_for_host(&ctx.client, &www)
    );

    // IPv6 is optional: absence never demotes the check
    AddressReport {
        status: CheckStatus::Pass,
        records: AddressRecords { root, www },
        issues: Vec::new(),
    }
}

async fn a_for_host(client: &DnsClient, host: &str) -> HostAddresses {
    match client.ipv4(host).await {
        Ok(addrs) => {
            let records: Vec<String> = addrs.iter().map(ToString::to_string).collect();
            let issues: Vec<String> = addrs
                .iter()
                .filter(|ip| !support::ipv4_is_public(**ip))
                .map(|ip| format!("IP {ip} is private/reserved/loopback"))
                .collect();
            let status = if records.is_empty() {
                CheckStatus::Error
            } else if issues.is_empty() {
                CheckStatus::Pass
            } else {
                CheckStatus::Warning
            };
            HostAddresses {
                status,
                count: records.len(),
                records,
                issues,
            }
        }
        Err(err) if err.is_nxdomain() => HostAddresses {
            status: CheckStatus::Error,
            records: Vec::new(),
            issues: vec![format!("Domain {host} does not exist")],
            count: 0,
        },
        Err(err) => HostAddresses {
            status: CheckStatus::Error,
            records: Vec::new(),
            issues: vec![format!("Failed to query A records for {host}: {err}")],
            count: 0,
        },
    }
}

async fn aaaa_for_host(client: &DnsClient, host: &str) -> HostAddresses {
    match client.ipv6(host).await {
        Ok(addrs) => {
            let records: Vec<String> = addrs.iter().map(ToString::to_string).collect();
            let issues: Vec<String> = addrs
                .iter()
                .filter(|ip| !support::ipv6_is_public(**ip))
                .map(|ip| format!("IPv6 {ip} is private/reserved/loopback"))
                .collect();
            HostAddresses {
                status: CheckStatus::Pass,
                count: records.len(),
                records,
                issues,
            }
        }
        Err(err) if err.is_absent() => HostAddresses {
            status: CheckStatus::Info,
            records: Vec::new(),
            issues: Vec::new(),
            count: 0,
        },
        Err(err) => HostAddresses {
            status: CheckStatus::Warning,
            records: Vec::new(),
            issues: vec![format!("Failed to query AAAA records for {host}: {err}")],
            count: 0,
        },
    }
}
