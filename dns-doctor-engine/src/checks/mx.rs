//! MX check: mail exchanger sanity.

use std::collections::BTreeMap;
use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use serde_json::json;

use super::{support, CheckContext};
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, IpAddress, MxRecord, MxReport, SubCheck};

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

/// Nameservers probed for MX RRset agreement.
const CONSISTENCY_PROBE_LIMIT: usize = 5;

pub(crate) async fn check(ctx: &CheckContext) -> MxReport {
    let pairs = match ctx.client.mx(ctx.domain.as_str()).await {
        Ok(pairs) => pairs,
        Err(err) if err.is_absent() => {
            return MxReport {
                status: CheckStatus::Info,
                records: Vec::new(),
                checks: vec![SubCheck::info(
                    "mx_records",
                    "No MX records found - email not configured for this domain.",
                )],
                count: 0,
            };
        }
        Err(err) => {
            return MxReport {
                status: CheckStatus::Error,
                records: Vec::new(),
                checks: vec![SubCheck::error(
                    "mx_records",
                    format!("Failed to query MX records: {err}"),
                )],
                count: 0,
            };
        }
    };

    let mut records = resolve_exchanges(&ctx.client, pairs).await;
    records.sort_by_key(|mx| mx.priority);

    let cname_violations = cname_violations(&ctx.client, &records).await;
    let reverse_entries = reverse_entries(&ctx.client, &records).await;
    let ns_consistency = consistency_subcheck(ctx, &records).await;

    let mut checks = Vec::new();
    checks.push(records_subcheck(&records));
    checks.push(name_validity_subcheck(&records));
    checks.push(count_subcheck(records.len()));
    checks.push(cname_subcheck(&cname_violations));
    checks.push(duplicate_priority_subcheck(&records));
    checks.push(public_ip_subcheck(&records));
    checks.push(literal_ip_subcheck(&records));
    checks.push(ns_consistency);
    checks.push(mismatched_a_subcheck(&records));
    checks.push(duplicate_a_subcheck(&records));
    if let Some(reverse) = reverse_subcheck(&reverse_entries) {
        checks.push(reverse);
    }

    let status = CheckStatus::roll_up(checks.iter().map(|c| c.status));
    MxReport {
        status,
        count: records.len(),
        records,
        checks,
    }
}

/// Resolve each exchange to its A/AAAA addresses (bounded fan-out).
async fn resolve_exchanges(client: &DnsClient, pairs: Vec<(u16, String)>) -> Vec<MxRecord> {
    stream::iter(pairs)
        .map(|(priority, host)| async move {
            let mut ips: Vec<IpAddress> = Vec::new();
            if let Ok(addrs) = client.ipv4(&host).await {
                ips.extend(addrs.into_iter().map(|ip| IpAddress::from(IpAddr::V4(ip))));
            }
            if let Ok(addrs) = client.ipv6(&host).await {
                ips.extend(addrs.into_iter().map(|ip| IpAddress::from(IpAddr::V6(ip))));
            }
            let error = ips
                .is_empty()
                .then(|| "Does not resolve to any IP".to_string());
            MxRecord {
                host,
                priority,
                ips,
                error,
            }
        })
        .buffered(FANOUT)
        .collect()
        .await
}

async fn cname_violations(client: &DnsClient, records: &[MxRecord]) -> Vec<String> {
    stream::iter(records.iter().cloned().map(|mx| mx.host))
        .map(|host| async move {
            match client.cname(&host).await {
                Ok(targets) if !targets.is_empty() => Some(host),
                _ => None,
            }
        })
        .buffered(FANOUT)
        .filter_map(std::future::ready)
        .collect()
        .await
}

async fn reverse_entries(client: &DnsClient, records: &[MxRecord]) -> Vec<String> {
    let ips: Vec<String> = records
        .iter()
        .flat_map(|mx| mx.ips.iter().map(|ip| ip.address.clone()))
        .collect();
    stream::iter(ips)
        .map(|ip| async move {
            match ip.parse::<IpAddr>() {
                Ok(addr) => match client.reverse(addr).await {
                    Ok(names) if !names.is_empty() => format!("{ip} -> {}", names[0]),
                    _ => format!("{ip} -> (no PTR)"),
                },
                Err(_) => format!("{ip} -> (no PTR)"),
            }
        })
        .buffered(FANOUT)
        .collect()
        .await
}

fn records_subcheck(records: &[MxRecord]) -> SubCheck {
    let summary: Vec<String> = records
        .iter()
        .map(|mx| {
            let ips = if mx.ips.is_empty() {
                "No IP".to_string()
            } else {
                mx.ips
                    .iter()
                    .map(|ip| ip.address.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!("{} {} {}", mx.priority, mx.host, ips)
        })
        .collect();
    SubCheck::info(
        "mx_records",
        "Your MX records that were reported by your nameservers are:",
    )
    .with_details(json!(summary))
}

fn name_validity_subcheck(records: &[MxRecord]) -> SubCheck {
    let invalid: Vec<String> = records
        .iter()
        .filter_map(|mx| {
            mx.error
                .as_ref()
                .map(|err| format!("{} ({err})", mx.host))
        })
        .collect();
    if invalid.is_empty() {
        SubCheck::pass(
            "mx_name_validity",
            "Good. All MX records resolve to IP addresses.",
        )
    } else {
        SubCheck::error(
            "mx_name_validity",
            format!("ERROR: Some MX records have issues: {}", invalid.join(", ")),
        )
        .with_details(json!(invalid))
    }
}

fn count_subcheck(count: usize) -> SubCheck {
    if count >= 2 {
        SubCheck::pass(
            "mx_count",
            format!("Good. You have {count} MX records. This is good for redundancy."),
        )
        .with_details(json!({ "count": count }))
    } else {
        SubCheck::warning(
            "mx_count",
            "You have only 1 MX record. Consider adding a backup MX for redundancy.",
        )
        .with_details(json!({ "count": count }))
    }
}

fn cname_subcheck(violations: &[String]) -> SubCheck {
    if violations.is_empty() {
        SubCheck::pass(
            "mx_cname_check",
            "Good. None of your MX records point to CNAME records.",
        )
    } else {
        SubCheck::error(
            "mx_cname_check",
            format!(
                "ERROR: MX records should not point to CNAME (RFC 2181). Violating MX: {}",
                violations.join(", ")
            ),
        )
        .with_details(json!(violations))
    }
}

fn duplicate_priority_subcheck(records: &[MxRecord]) -> SubCheck {
    let mut priorities: Vec<u16> = records.iter().map(|mx| mx.priority).collect();
    let total = priorities.len();
    priorities.sort_unstable();
    priorities.dedup();
    if priorities.len() == total {
        SubCheck::pass("mx_duplicate_priorities", "OK. All MX priorities are distinct.")
    } else {
        SubCheck::warning(
            "mx_duplicate_priorities",
            "WARNING: Duplicate MX priorities found. This may cause unpredictable mail routing.",
        )
        .with_details(json!(records
            .iter()
            .map(|mx| mx.priority)
            .collect::<Vec<_>>()))
    }
}

fn public_ip_subcheck(records: &[MxRecord]) -> SubCheck {
    let private: Vec<String> = records
        .iter()
        .flat_map(|mx| {
            mx.ips.iter().filter_map(|ip| {
                (support::ip_str_is_public(&ip.address) == Some(false))
                    .then(|| format!("{} [{}]", mx.host, ip.address))
            })
        })
        .collect();
    if private.is_empty() {
        SubCheck::pass(
            "mx_ips_public",
            "OK. All of your MX records appear to use public IPs.",
        )
    } else {
        SubCheck::error(
            "mx_ips_public",
            format!(
                "ERROR: Some MX records use private IP addresses: {}",
                private.join(", ")
            ),
        )
        .with_details(json!(private))
    }
}

fn literal_ip_subcheck(records: &[MxRecord]) -> SubCheck {
    let literals: Vec<&str> = records
        .iter()
        .filter(|mx| support::is_ipv4_literal(&mx.host))
        .map(|mx| mx.host.as_str())
        .collect();
    if literals.is_empty() {
        SubCheck::pass("mx_is_not_ip", "OK. All of your MX records are host names.")
    } else {
        SubCheck::error(
            "mx_is_not_ip",
            format!(
                "ERROR: MX records should use hostnames, not IP addresses: {}",
                literals.join(", ")
            ),
        )
        .with_details(json!(literals))
    }
}

/// Ask each nameserver directly for the MX RRset and compare.
async fn consistency_subcheck(ctx: &CheckContext, records: &[MxRecord]) -> SubCheck {
    let expected: Vec<(u16, String)> = records
        .iter()
        .map(|mx| (mx.priority, mx.host.clone()))
        .collect();

    let Ok((hosts, _ttl)) = ctx.client.ns(ctx.domain.as_str()).await else {
        return SubCheck::info(
            "different_mx_records",
            "Could not compare MX records across nameservers",
        );
    };

    let client = &ctx.client;
    let domain = &ctx.domain;
    let per_server: Vec<(String, Option<Vec<(u16, String)>>)> =
        stream::iter(hosts.into_iter().take(CONSISTENCY_PROBE_LIMIT))
            .map(|host| async move {
                let Ok(ips) = client.ipv4(&host).await else {
                    return (host, None);
                };
                let Some(ip) = ips.first().copied() else {
                    return (host, None);
                };
                let response = client
                    .query_at(
                        IpAddr::V4(ip),
                        domain.as_str(),
                        hickory_resolver::proto::rr::RecordType::MX,
                        false,
                    )
                    .await;
                let set = response.ok().map(|r| {
                    let mut set: Vec<(u16, String)> = r
                        .answers
                        .iter()
                        .filter_map(|record| record.data().as_mx())
                        .map(|mx| {
                            (
                                mx.preference(),
                                mx.exchange()
                                    .to_string()
                                    .trim_end_matches('.')
                                    .to_ascii_lowercase(),
                            )
                        })
                        .collect();
                    set.sort();
                    set
                });
                (host, set)
            })
            .buffered(FANOUT)
            .collect()
            .await;

    let mut expected_sorted = expected;
    expected_sorted.sort();
    let disagreeing: Vec<&String> = per_server
        .iter()
        .filter(|(_, set)| matches!(set, Some(set) if *set != expected_sorted))
        .map(|(host, _)| host)
        .collect();

    if disagreeing.is_empty() {
        SubCheck::pass(
            "different_mx_records",
            "Good. Looks like all your nameservers have the same set of MX records.",
        )
    } else {
        SubCheck::error(
            "different_mx_records",
            format!(
                "ERROR: Nameservers disagree about your MX records: {}",
                disagreeing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(json!(disagreeing))
    }
}

/// The same exchange listed twice should resolve to one address set.
fn mismatched_a_subcheck(records: &[MxRecord]) -> SubCheck {
    let mut seen: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut mismatched: Vec<&str> = Vec::new();
    for mx in records {
        let mut ips: Vec<&str> = mx.ips.iter().map(|ip| ip.address.as_str()).collect();
        ips.sort_unstable();
        match seen.get(mx.host.as_str()) {
            Some(prior) if *prior != ips => mismatched.push(&mx.host),
            Some(_) => {}
            None => {
                seen.insert(&mx.host, ips);
            }
        }
    }
    if mismatched.is_empty() {
        SubCheck::pass(
            "mismatched_mx_a",
            "OK. I did not detect differing IPs for your MX records.",
        )
    } else {
        SubCheck::warning(
            "mismatched_mx_a",
            format!(
                "WARNING: Some MX hosts resolve to differing IPs: {}",
                mismatched.join(", ")
            ),
        )
        .with_details(json!(mismatched))
    }
}

fn duplicate_a_subcheck(records: &[MxRecord]) -> SubCheck {
    let all_ips: Vec<&str> = records
        .iter()
        .flat_map(|mx| mx.ips.iter().map(|ip| ip.address.as_str()))
        .collect();
    let mut duplicates: Vec<&str> = all_ips
        .iter()
        .filter(|ip| all_ips.iter().filter(|other| other == ip).count() > 1)
        .copied()
        .collect();
    duplicates.sort_unstable();
    duplicates.dedup();

    if duplicates.is_empty() {
        SubCheck::pass(
            "duplicate_mx_a",
            "OK. I have not found duplicate IP(s) for your MX records. This is a good thing.",
        )
    } else {
        SubCheck::warning(
            "duplicate_mx_a",
            format!(
                "WARNING: Multiple MX records share the same IP(s): {}",
                duplicates.join(", ")
            ),
        )
        .with_details(json!(duplicates))
    }
}

fn reverse_subcheck(entries: &[String]) -> Option<SubCheck> {
    if entries.is_empty() {
        return None;
    }
    Some(
        SubCheck::pass("reverse_mx_a", "Your reverse (PTR) record:")
            .with_details(json!(entries)),
    )
}
