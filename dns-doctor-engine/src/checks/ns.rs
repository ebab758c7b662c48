//! NS check: parent delegation vs. the zone's own NS RRset, plus a battery
//! of nameserver-quality sub-checks.

use std::collections::BTreeMap;
use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use hickory_resolver::proto::rr::{DNSClass, RecordType};
use serde_json::json;

use super::{support, CheckContext};
use crate::delegation;
use crate::domain::{is_valid_hostname, Domain};
use crate::resolver::DnsClient;
use crate::types::{
    CheckStatus, DomainNameservers, IpAddress, NsComparison, NsRecord, NsReport, ParentDelegation,
    SubCheck,
};

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

/// Nameservers probed for open recursion.
const RECURSION_PROBE_LIMIT: usize = 3;

/// Nameservers probed for SOA responsiveness.
const RESPONSE_PROBE_LIMIT: usize = 10;

/// Nameservers probed with ICMP echo.
const PING_PROBE_LIMIT: usize = 5;

/// Third-party name used to detect open recursion. A nameserver that hands
/// out answers for a zone it is not authoritative for is an open resolver.
const RECURSION_PROBE_NAME: &str = "google.com";
const RECURSION_PROBE_FALLBACK: &str = "example.com";

pub(crate) async fn check(ctx: &CheckContext) -> NsReport {
    let parent = delegation::probe(&ctx.domain, &ctx.registry, &ctx.client).await;
    let domain_ns = domain_nameservers(&ctx.domain, &ctx.client).await;

    let parent_set: Vec<&String> = parent.records.iter().collect();
    let domain_set: Vec<&String> = domain_ns.records.iter().collect();
    let only_in_parent: Vec<String> = parent
        .records
        .iter()
        .filter(|ns| !domain_set.contains(ns))
        .cloned()
        .collect();
    let only_in_domain: Vec<String> = domain_ns
        .records
        .iter()
        .filter(|ns| !parent_set.contains(ns))
        .cloned()
        .collect();
    let matches = only_in_parent.is_empty() && only_in_domain.is_empty();
    let comparisons = NsComparison {
        matches,
        parent_count: parent.records.len(),
        domain_count: domain_ns.records.len(),
        only_in_parent: only_in_parent.clone(),
        only_in_domain: only_in_domain.clone(),
    };

    let records = union_records(&parent, &domain_ns);

    let mut checks: Vec<SubCheck> = Vec::new();
    checks.push(parent_delegation_subcheck(&parent));
    checks.push(domain_nameservers_subcheck(&domain_ns));
    checks.push(comparison_subcheck(&comparisons));
    if !matches {
        if !only_in_parent.is_empty() {
            checks.push(
                SubCheck::error(
                    "missing_at_domain",
                    "Missing nameservers reported by your nameservers",
                )
                .with_details(json!(only_in_parent)),
            );
        }
        if !only_in_domain.is_empty() {
            checks.push(
                SubCheck::error(
                    "missing_at_parent",
                    "Missing nameservers reported by parent",
                )
                .with_details(json!(only_in_domain)),
            );
        }
    }

    checks.push(recursive_queries_subcheck(ctx, &records).await);
    checks.push(same_class_subcheck(ctx).await);
    checks.push(responded_subcheck(ctx, &records).await);
    checks.push(different_subnets_subcheck(&records));
    checks.push(glue_detail_subcheck(&ctx.domain, &records));
    checks.push(hostname_validity_subcheck(&domain_ns.records));
    checks.push(ping_subcheck(&ctx.client, &records).await);
    checks.push(count_subcheck(domain_ns.records.len()));

    let status = if parent.records.is_empty() || domain_ns.records.is_empty() || !matches {
        CheckStatus::Error
    } else {
        CheckStatus::roll_up(checks.iter().map(|c| c.status))
    };

    let glue_records = records.iter().any(|r| !r.ips.is_empty());
    NsReport {
        status,
        count: records.len(),
        records,
        parent_server: parent.tld_server_used.clone(),
        parent_delegation: parent,
        domain_nameservers: domain_ns,
        comparisons,
        glue_records,
        checks,
    }
}

/// NS RRset for the domain via the recursive resolver, each target enriched
/// with its A records.
async fn domain_nameservers(domain: &Domain, client: &DnsClient) -> DomainNameservers {
    let (hosts, ttl) = match client.ns(domain.as_str()).await {
        Ok(answer) => answer,
        Err(err) => {
            return DomainNameservers {
                status: CheckStatus::Error,
                records: Vec::new(),
                nameserver_ips: BTreeMap::new(),
                ttl: None,
                resolver_used: client.resolver_label().to_string(),
                error: Some(err.to_string()),
            };
        }
    };

    let mut hosts: Vec<String> = hosts
        .into_iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    hosts.sort();
    hosts.dedup();

    let nameserver_ips: BTreeMap<String, Vec<String>> = stream::iter(hosts.iter().cloned())
        .map(|host| async move {
            let ips = client
                .ipv4(&host)
                .await
                .map(|addrs| addrs.iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            (host, ips)
        })
        .buffered(FANOUT)
        .collect()
        .await;

    DomainNameservers {
        status: CheckStatus::Pass,
        records: hosts,
        nameserver_ips,
        ttl,
        resolver_used: client.resolver_label().to_string(),
        error: None,
    }
}

/// Union of parent and domain NS records; a host seen in both places is
/// listed once, attributed to the parent.
fn union_records(parent: &ParentDelegation, domain_ns: &DomainNameservers) -> Vec<NsRecord> {
    let mut records: Vec<NsRecord> = Vec::new();
    for host in &parent.records {
        records.push(NsRecord {
            host: host.clone(),
            ips: ip_records(parent.nameserver_ips.get(host)),
            ttl: parent.ttl,
            source: crate::types::NsSource::Parent,
        });
    }
    for host in &domain_ns.records {
        if records.iter().any(|r| &r.host == host) {
            continue;
        }
        records.push(NsRecord {
            host: host.clone(),
            ips: ip_records(domain_ns.nameserver_ips.get(host)),
            ttl: domain_ns.ttl,
            source: crate::types::NsSource::Domain,
        });
    }
    records
}

fn ip_records(ips: Option<&Vec<String>>) -> Vec<IpAddress> {
    ips.map(|list| {
        list.iter()
            .filter_map(|s| s.parse::<IpAddr>().ok())
            .map(IpAddress::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parent_delegation_subcheck(parent: &ParentDelegation) -> SubCheck {
    if parent.status == CheckStatus::Pass {
        SubCheck::pass(
            "parent_delegation",
            format!(
                "Found {} NS records from TLD delegation",
                parent.records.len()
            ),
        )
        .with_details(json!({
            "records": parent.records,
            "serverUsed": parent.tld_server_used,
        }))
    } else {
        SubCheck::error(
            "parent_delegation",
            format!(
                "Failed to get parent delegation: {}",
                parent.error.as_deref().unwrap_or("Unknown error")
            ),
        )
    }
}

fn domain_nameservers_subcheck(domain_ns: &DomainNameservers) -> SubCheck {
    if domain_ns.status == CheckStatus::Pass {
        SubCheck::pass(
            "domain_nameservers",
            format!(
                "Found {} NS records from domain query",
                domain_ns.records.len()
            ),
        )
        .with_details(json!({
            "records": domain_ns.records,
            "resolverUsed": domain_ns.resolver_used,
        }))
    } else {
        SubCheck::error(
            "domain_nameservers",
            format!(
                "Failed to get domain NS records: {}",
                domain_ns.error.as_deref().unwrap_or("Unknown error")
            ),
        )
    }
}

fn comparison_subcheck(comparisons: &NsComparison) -> SubCheck {
    if comparisons.matches {
        SubCheck::pass(
            "comparison",
            "Parent delegation and domain NS records match",
        )
        .with_details(json!({
            "match": true,
            "parentCount": comparisons.parent_count,
            "domainCount": comparisons.domain_count,
        }))
    } else {
        SubCheck::error(
            "comparison",
            "Parent delegation and domain NS records differ",
        )
        .with_details(json!({
            "match": false,
            "parentCount": comparisons.parent_count,
            "domainCount": comparisons.domain_count,
            "onlyInParent": comparisons.only_in_parent,
            "onlyInDomain": comparisons.only_in_domain,
        }))
    }
}

/// Probe up to three nameservers with an RD=0 query for an unrelated name;
/// a non-authoritative answer means the server recurses for strangers.
async fn recursive_queries_subcheck(ctx: &CheckContext, records: &[NsRecord]) -> SubCheck {
    let probe_name = if ctx.domain.is_in_bailiwick(RECURSION_PROBE_NAME) {
        RECURSION_PROBE_FALLBACK
    } else {
        RECURSION_PROBE_NAME
    };

    let targets: Vec<(String, IpAddr)> = records
        .iter()
        .filter_map(|r| {
            r.ips
                .first()
                .and_then(|ip| ip.address.parse().ok())
                .map(|ip| (r.host.clone(), ip))
        })
        .take(RECURSION_PROBE_LIMIT)
        .collect();

    if targets.is_empty() {
        return SubCheck::info("recursive_queries", "Could not test recursive queries");
    }

    let client = &ctx.client;
    let open: Vec<String> = stream::iter(targets)
        .map(|(host, ip)| async move {
            match client.query_at(ip, probe_name, RecordType::A, false).await {
                Ok(response) if !response.answers.is_empty() && !response.authoritative => {
                    Some(host)
                }
                // Refusals and timeouts mean recursion is off, which is good
                _ => None,
            }
        })
        .buffered(FANOUT)
        .filter_map(std::future::ready)
        .collect()
        .await;

    if open.is_empty() {
        SubCheck::pass(
            "recursive_queries",
            "Good. Your nameservers do not allow recursive queries from external sources.",
        )
    } else {
        SubCheck::warning(
            "recursive_queries",
            format!(
                "WARNING: Some nameservers allow recursive queries: {}. This is a security risk.",
                open.join(", ")
            ),
        )
        .with_details(json!(open))
    }
}

/// Every NS record must be class IN.
async fn same_class_subcheck(ctx: &CheckContext) -> SubCheck {
    match ctx
        .client
        .lookup_raw(ctx.domain.as_str(), RecordType::NS)
        .await
    {
        Ok(records) if !records.is_empty() => {
            let all_in = records.iter().all(|r| r.dns_class() == DNSClass::IN);
            if all_in {
                SubCheck::pass(
                    "same_class",
                    "OK. All of your NS records are class IN (Internet).",
                )
            } else {
                SubCheck::error("same_class", "ERROR: Not all NS records are class IN")
            }
        }
        _ => SubCheck::info("same_class", "Could not verify NS record class"),
    }
}

/// Directly query SOA at each nameserver IP and flag the silent ones.
async fn responded_subcheck(ctx: &CheckContext, records: &[NsRecord]) -> SubCheck {
    let targets: Vec<(String, Option<IpAddr>)> = records
        .iter()
        .map(|r| {
            (
                r.host.clone(),
                r.ips.first().and_then(|ip| ip.address.parse().ok()),
            )
        })
        .take(RESPONSE_PROBE_LIMIT)
        .collect();

    if targets.is_empty() {
        return SubCheck::warning(
            "dns_servers_responded",
            "Could not test nameserver responses",
        );
    }

    let client = &ctx.client;
    let domain = &ctx.domain;
    let results: Vec<(String, bool)> = stream::iter(targets)
        .map(|(host, ip)| async move {
            let responded = match ip {
                Some(ip) => client.soa_serial_at(ip, domain.as_str()).await.is_ok(),
                None => false,
            };
            (host, responded)
        })
        .buffered(FANOUT)
        .collect()
        .await;

    let responsive: Vec<&String> = results.iter().filter(|(_, ok)| *ok).map(|(h, _)| h).collect();
    let silent: Vec<&String> = results.iter().filter(|(_, ok)| !*ok).map(|(h, _)| h).collect();

    if !silent.is_empty() {
        SubCheck::error(
            "dns_servers_responded",
            format!(
                "ERROR: Some nameservers did not respond: {}",
                silent
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(json!({ "responsive": responsive, "nonResponsive": silent }))
    } else {
        SubCheck::pass(
            "dns_servers_responded",
            "Good. All nameservers responded successfully.",
        )
        .with_details(json!({ "responsive": responsive, "nonResponsive": [] }))
    }
}

/// Nameservers spread over multiple /24 networks survive a single outage.
fn different_subnets_subcheck(records: &[NsRecord]) -> SubCheck {
    let mut all_ips: Vec<&str> = records
        .iter()
        .flat_map(|r| r.ips.iter().map(|ip| ip.address.as_str()))
        .collect();
    all_ips.sort_unstable();
    all_ips.dedup();

    if all_ips.len() < 2 {
        return SubCheck::info(
            "different_subnets",
            "Not enough IPs to check subnet diversity",
        )
        .with_details(json!(all_ips));
    }

    let mut subnets: Vec<String> = all_ips
        .iter()
        .filter_map(|ip| support::subnet24(ip))
        .collect();
    subnets.sort();
    subnets.dedup();

    match subnets.len() {
        0 => SubCheck::info("different_subnets", "Could not determine subnet diversity"),
        1 => SubCheck::warning(
            "different_subnets",
            "WARNING: All nameservers are on the same subnet. Consider using nameservers on \
             different networks for better redundancy.",
        )
        .with_details(json!({ "subnetCount": 1, "subnets": subnets })),
        n => SubCheck::pass(
            "different_subnets",
            format!("Good. Your nameservers are on {n} different subnets. This is good for redundancy."),
        )
        .with_details(json!({ "subnetCount": n, "subnets": subnets })),
    }
}

/// Per-nameserver glue detail: who needs glue, who has it.
fn glue_detail_subcheck(domain: &Domain, records: &[NsRecord]) -> SubCheck {
    let mut details = Vec::new();
    let mut glue_ips: Vec<&str> = Vec::new();
    for record in records {
        let needs_glue = domain.is_in_bailiwick(&record.host);
        let has_glue = !record.ips.is_empty();
        if has_glue {
            glue_ips.extend(record.ips.iter().map(|ip| ip.address.as_str()));
        }
        details.push(json!({
            "nameserver": record.host,
            "needsGlue": needs_glue,
            "hasGlue": has_glue,
            "ips": record.ips,
        }));
    }

    if glue_ips.is_empty() {
        SubCheck::warning(
            "glue_for_ns_records",
            "WARNING: No glue records found. Nameservers may need glue records if they are \
             within your domain.",
        )
        .with_details(json!(details))
    } else {
        SubCheck::info(
            "glue_for_ns_records",
            format!(
                "INFO: Glue IPs found for your nameservers: {}",
                glue_ips.join(", ")
            ),
        )
        .with_details(json!(details))
    }
}

fn hostname_validity_subcheck(hosts: &[String]) -> SubCheck {
    let invalid: Vec<&String> = hosts.iter().filter(|h| !is_valid_hostname(h)).collect();
    if invalid.is_empty() {
        SubCheck::pass(
            "name_of_nameservers_valid",
            "OK: All of the NS records that your nameservers report have valid names",
        )
    } else {
        SubCheck::error(
            "name_of_nameservers_valid",
            format!(
                "ERROR: Some nameserver names are invalid: {}",
                invalid
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(json!(invalid))
    }
}

/// ICMP echo against each nameserver. All-fail is only a warning because
/// firewalls routinely drop echo requests.
async fn ping_subcheck(client: &DnsClient, records: &[NsRecord]) -> SubCheck {
    let targets: Vec<(String, String)> = records
        .iter()
        .filter_map(|r| r.ips.first().map(|ip| (r.host.clone(), ip.address.clone())))
        .take(PING_PROBE_LIMIT)
        .collect();

    if targets.is_empty() {
        return SubCheck::info(
            "is_ping_nameservers_work",
            "Could not test ping (no IPs available)",
        );
    }

    let results: Vec<(String, String, bool)> = stream::iter(targets)
        .map(|(host, ip)| async move {
            let alive = client.ping(&ip).await;
            (host, ip, alive)
        })
        .buffered(FANOUT)
        .collect()
        .await;

    let alive = results.iter().filter(|(_, _, ok)| *ok).count();
    let details: Vec<_> = results
        .iter()
        .map(|(host, ip, ok)| json!({ "ns": host, "ip": ip, "ping": ok }))
        .collect();

    if alive == 0 {
        SubCheck::warning(
            "is_ping_nameservers_work",
            "WARNING: None of your nameservers responded to ping. This may be normal if ICMP \
             is blocked by firewalls.",
        )
        .with_details(json!(details))
    } else {
        SubCheck::pass(
            "is_ping_nameservers_work",
            format!(
                "Good: {alive} out of {} nameservers responded to ping.",
                results.len()
            ),
        )
        .with_details(json!(details))
    }
}

fn count_subcheck(count: usize) -> SubCheck {
    match count {
        0 => SubCheck::error("multiple_nameservers", "ERROR. No nameservers found."),
        1 => SubCheck::error(
            "multiple_nameservers",
            "ERROR. You have only 1 nameserver. You need at least 2, and preferably more than that.",
        ),
        n => SubCheck::pass(
            "multiple_nameservers",
            format!(
                "Good. You have {n} nameservers. According to RFC 2182 section 5 you must have \
                 at least 3 nameservers, and no more than 7. Having 2 is not advised."
            ),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::NsSource;

    fn ns_record(host: &str, ips: &[&str], source: NsSource) -> NsRecord {
        NsRecord {
            host: host.to_string(),
            ips: ips
                .iter()
                .map(|s| IpAddress::from(s.parse::<IpAddr>().unwrap()))
                .collect(),
            ttl: Some(3600),
            source,
        }
    }

    fn parent(records: &[&str]) -> ParentDelegation {
        ParentDelegation {
            status: if records.is_empty() {
                CheckStatus::Error
            } else {
                CheckStatus::Pass
            },
            records: records.iter().map(ToString::to_string).collect(),
            nameserver_ips: records
                .iter()
                .map(|r| ((*r).to_string(), vec!["198.51.100.1".to_string()]))
                .collect(),
            glue: BTreeMap::new(),
            tld_server_used: Some("a.gtld-servers.net".to_string()),
            tld_server_ip: Some("192.5.6.30".to_string()),
            ttl: Some(172_800),
            error: None,
        }
    }

    fn domain_side(records: &[&str]) -> DomainNameservers {
        DomainNameservers {
            status: CheckStatus::Pass,
            records: records.iter().map(ToString::to_string).collect(),
            nameserver_ips: records
                .iter()
                .map(|r| ((*r).to_string(), vec!["203.0.113.9".to_string()]))
                .collect(),
            ttl: Some(3600),
            resolver_used: "8.8.8.8,1.1.1.1".to_string(),
            error: None,
        }
    }

    #[test]
    fn test_union_prefers_parent_source() {
        let parent = parent(&["ns1.example.net", "ns2.example.net"]);
        let domain_ns = domain_side(&["ns1.example.net", "ns3.example.net"]);
        let records = union_records(&parent, &domain_ns);

        assert_eq!(records.len(), 3);
        let ns1 = records.iter().find(|r| r.host == "ns1.example.net").unwrap();
        assert_eq!(ns1.source, NsSource::Parent);
        let ns3 = records.iter().find(|r| r.host == "ns3.example.net").unwrap();
        assert_eq!(ns3.source, NsSource::Domain);
        // No duplicate hosts
        let mut hosts: Vec<&str> = records.iter().map(|r| r.host.as_str()).collect();
        hosts.sort_unstable();
        hosts.dedup();
        assert_eq!(hosts.len(), records.len());
    }

    #[test]
    fn test_count_subcheck_thresholds() {
        assert_eq!(count_subcheck(0).status, CheckStatus::Error);
        assert_eq!(count_subcheck(1).status, CheckStatus::Error);
        assert_eq!(count_subcheck(2).status, CheckStatus::Pass);
        assert_eq!(count_subcheck(4).status, CheckStatus::Pass);
    }

    #[test]
    fn test_different_subnets_warns_on_single_subnet() {
        let records = vec![
            ns_record("ns1.example.net", &["198.51.100.1"], NsSource::Parent),
            ns_record("ns2.example.net", &["198.51.100.2"], NsSource::Parent),
        ];
        let sub = different_subnets_subcheck(&records);
        assert_eq!(sub.status, CheckStatus::Warning);
    }

    #[test]
    fn test_different_subnets_passes_on_two_subnets() {
        let records = vec![
            ns_record("ns1.example.net", &["198.51.100.1"], NsSource::Parent),
            ns_record("ns2.example.net", &["203.0.113.2"], NsSource::Parent),
        ];
        let sub = different_subnets_subcheck(&records);
        assert_eq!(sub.status, CheckStatus::Pass);
    }

    #[test]
    fn test_different_subnets_info_when_one_ip() {
        let records = vec![ns_record("ns1.example.net", &["198.51.100.1"], NsSource::Parent)];
        let sub = different_subnets_subcheck(&records);
        assert_eq!(sub.status, CheckStatus::Info);
    }

    #[test]
    fn test_hostname_validity_flags_underscores() {
        let hosts = vec!["ns_bad.example.net".to_string(), "ns1.example.net".to_string()];
        let sub = hostname_validity_subcheck(&hosts);
        assert_eq!(sub.status, CheckStatus::Error);
        assert!(sub.message.contains("ns_bad.example.net"));

        let hosts = vec!["ns1.example.net".to_string()];
        assert_eq!(hostname_validity_subcheck(&hosts).status, CheckStatus::Pass);
    }

    #[test]
    fn test_glue_detail_tracks_bailiwick() {
        let domain = Domain::parse("example.com").unwrap();
        let records = vec![
            ns_record("ns1.example.com", &["203.0.113.9"], NsSource::Parent),
            ns_record("ns.other.net", &[], NsSource::Domain),
        ];
        let sub = glue_detail_subcheck(&domain, &records);
        assert_eq!(sub.status, CheckStatus::Info);
        let details = sub.details.unwrap();
        assert_eq!(details[0]["needsGlue"], true);
        assert_eq!(details[1]["needsGlue"], false);
        assert_eq!(details[1]["hasGlue"], false);
    }

    #[test]
    fn test_comparison_subcheck_mismatch_is_error() {
        let comparison = NsComparison {
            matches: false,
            parent_count: 2,
            domain_count: 1,
            only_in_parent: vec!["ns2.example.net".to_string()],
            only_in_domain: vec![],
        };
        let sub = comparison_subcheck(&comparison);
        assert_eq!(sub.status, CheckStatus::Error);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_ns_check_google() {
        let ctx = CheckContext {
            domain: Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::builtin()),
        };
        let report = check(&ctx).await;
        assert_eq!(report.status, CheckStatus::Pass);
        assert!(report.comparisons.matches);
        assert!(report.count >= 2);
    }
}
