//! DOMAIN_STATUS check: is this domain alive, configured, and legitimate?
//!
//! A composite of DNS-only heuristics for suspended, expired, and parked
//! domains; no WHOIS involved.

use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use hickory_resolver::proto::rr::RecordType;
use rand::Rng;
use serde_json::json;

use super::CheckContext;
use crate::error::LookupErrorKind;
use crate::types::{
    CheckStatus, DomainStatusChecks, DomainStatusReport, StatusProbe,
};

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

/// Nameservers probed for SOA responsiveness.
const NS_PROBE_LIMIT: usize = 5;

/// Address prefixes that mark a zone as parked, suspended, or misconfigured:
/// loopback, null route, documentation and RFC 1918 ranges, plus known
/// parking-service blocks.
const SUSPICIOUS_IP_PREFIXES: [&str; 11] = [
    "127.0.0.1",
    "0.0.0.0",
    "192.0.2.",
    "198.51.100.",
    "203.0.113.",
    "10.",
    "172.16.",
    "192.168.",
    "69.46.86.",
    "69.46.84.",
    "98.124.",
];

/// Substrings of nameserver hostnames operated by parking services.
const PARKING_NS_PATTERNS: [&str; 6] = [
    "parkingcrew",
    "sedoparking",
    "domainparking",
    "parking.com",
    "suspended",
    "expired",
];

/// Keywords in TXT records that betray a parked or suspended zone.
const PARKING_TXT_KEYWORDS: [&str; 4] = ["parked", "suspended", "expired", "parking"];

pub(crate) async fn check(ctx: &CheckContext) -> DomainStatusReport {
    let detailed_checks = DomainStatusChecks {
        ns_resolution: ns_resolution_probe(ctx).await,
        authoritative_response: authoritative_probe(ctx).await,
        suspicious_patterns: suspicious_patterns_probe(ctx).await,
        parking_detection: parking_probe(ctx).await,
        error_responses: error_responses_probe(ctx).await,
    };

    let mut critical_issues = Vec::new();
    let mut warnings = Vec::new();

    if detailed_checks.ns_resolution.status == CheckStatus::Error {
        critical_issues
            .push("Domain NS records not resolving - domain may be suspended/expired".to_string());
    }
    if detailed_checks.authoritative_response.status == CheckStatus::Error {
        critical_issues
            .push("No authoritative DNS response - domain configuration issue".to_string());
    }
    if detailed_checks.suspicious_patterns.status == CheckStatus::Warning {
        warnings.extend(detailed_checks.suspicious_patterns.issues.iter().cloned());
    }
    if detailed_checks.parking_detection.status == CheckStatus::Warning {
        warnings.push("Domain appears to be parked or suspended".to_string());
    }
    if detailed_checks.error_responses.status == CheckStatus::Warning {
        warnings.extend(detailed_checks.error_responses.issues.iter().cloned());
    }

    let (status, message) = if let Some(first) = critical_issues.first() {
        (
            CheckStatus::Error,
            format!("DOMAIN ISSUE DETECTED: {first}"),
        )
    } else if !warnings.is_empty() {
        (
            CheckStatus::Warning,
            format!("POTENTIAL ISSUES: {}", warnings[..warnings.len().min(2)].join(", ")),
        )
    } else {
        (
            CheckStatus::Pass,
            "Domain appears to be properly configured and active".to_string(),
        )
    };

    let recommendations = recommendations(&critical_issues, &warnings);
    DomainStatusReport {
        status,
        message,
        detailed_checks,
        critical_issues,
        warnings,
        recommendations,
    }
}

/// NS records must exist and at least one nameserver must answer SOA.
async fn ns_resolution_probe(ctx: &CheckContext) -> StatusProbe {
    let hosts = match ctx.client.ns(ctx.domain.as_str()).await {
        Ok((hosts, _ttl)) => hosts,
        Err(err) if err.kind == LookupErrorKind::NxDomain => {
            return StatusProbe::new(
                CheckStatus::Error,
                "Domain does not exist (NXDOMAIN) - may be expired or invalid",
            )
            .with_details(json!({ "errorType": "NXDOMAIN" }));
        }
        Err(err) if err.is_nodata() => {
            return StatusProbe::new(
                CheckStatus::Error,
                "No NS records found - domain configuration issue",
            )
            .with_details(json!({ "errorType": "NoAnswer" }));
        }
        Err(err) => {
            return StatusProbe::new(CheckStatus::Error, format!("NS resolution failed: {err}"));
        }
    };

    if hosts.is_empty() {
        return StatusProbe::new(
            CheckStatus::Error,
            "No NS records found - domain may be expired/suspended",
        );
    }

    let client = &ctx.client;
    let domain = &ctx.domain;
    let results: Vec<(String, bool)> = stream::iter(hosts.into_iter().take(NS_PROBE_LIMIT))
        .map(|host| async move {
            let responded = match client.ipv4(&host).await {
                Ok(ips) => match ips.first() {
                    Some(ip) => client
                        .soa_serial_at(IpAddr::V4(*ip), domain.as_str())
                        .await
                        .is_ok(),
                    None => false,
                },
                Err(_) => false,
            };
            (host, responded)
        })
        .buffered(FANOUT)
        .collect()
        .await;

    let working: Vec<&String> = results.iter().filter(|(_, ok)| *ok).map(|(h, _)| h).collect();
    let failed: Vec<&String> = results.iter().filter(|(_, ok)| !*ok).map(|(h, _)| h).collect();

    if working.is_empty() {
        StatusProbe::new(
            CheckStatus::Error,
            "No nameservers responding - domain likely suspended/expired",
        )
        .with_details(json!({ "failedNs": failed }))
    } else if failed.is_empty() {
        StatusProbe::new(
            CheckStatus::Pass,
            format!("All {} nameservers responding", working.len()),
        )
        .with_details(json!({ "workingNs": working }))
    } else {
        StatusProbe::new(
            CheckStatus::Warning,
            format!("{} nameservers not responding", failed.len()),
        )
        .with_details(json!({ "workingNs": working, "failedNs": failed }))
    }
}

/// Ask a domain nameserver for SOA and require the AA flag.
async fn authoritative_probe(ctx: &CheckContext) -> StatusProbe {
    let ns_ip = match ctx.client.ns(ctx.domain.as_str()).await {
        Ok((hosts, _ttl)) => {
            let mut found = None;
            for host in hosts {
                if let Ok(ips) = ctx.client.ipv4(&host).await {
                    if let Some(ip) = ips.first() {
                        found = Some(IpAddr::V4(*ip));
                        break;
                    }
                }
            }
            found
        }
        Err(err) if err.kind == LookupErrorKind::NxDomain => {
            return StatusProbe::new(
                CheckStatus::Error,
                "Domain does not exist - likely expired or suspended",
            )
            .with_details(json!({ "errorType": "NXDOMAIN" }));
        }
        Err(err) => {
            return StatusProbe::new(
                CheckStatus::Error,
                format!("Authoritative query failed: {err}"),
            );
        }
    };

    let Some(ns_ip) = ns_ip else {
        return StatusProbe::new(
            CheckStatus::Error,
            "Authoritative query failed: no nameserver address available",
        );
    };

    match ctx
        .client
        .query_at(ns_ip, ctx.domain.as_str(), RecordType::SOA, false)
        .await
    {
        Ok(response) if response.authoritative && !response.answers.is_empty() => {
            StatusProbe::new(CheckStatus::Pass, "Authoritative DNS responses working")
                .with_details(json!({ "authoritative": true }))
        }
        Ok(_) => StatusProbe::new(
            CheckStatus::Warning,
            "DNS responses not authoritative - possible configuration issue",
        )
        .with_details(json!({ "authoritative": false })),
        Err(err) => StatusProbe::new(
            CheckStatus::Error,
            format!("Authoritative query failed: {err}"),
        ),
    }
}

/// Parking IPs, suspicious MX names, wildcard catch-alls.
async fn suspicious_patterns_probe(ctx: &CheckContext) -> StatusProbe {
    let mut issues = Vec::new();
    let mut details = serde_json::Map::new();

    let a_records = match ctx.client.ipv4(ctx.domain.as_str()).await {
        Ok(ips) => ips.iter().map(ToString::to_string).collect::<Vec<_>>(),
        Err(err) if err.is_absent() => Vec::new(),
        Err(err) => {
            return StatusProbe::new(
                CheckStatus::Error,
                format!("Pattern analysis failed: {err}"),
            );
        }
    };
    for ip in &a_records {
        if SUSPICIOUS_IP_PREFIXES
            .iter()
            .any(|prefix| ip.starts_with(prefix))
        {
            issues.push(format!("A record points to suspicious IP: {ip}"));
        }
    }
    details.insert("aRecords".to_string(), json!(a_records));

    if let Ok(mx_pairs) = ctx.client.mx(ctx.domain.as_str()).await {
        let mx_hosts: Vec<String> = mx_pairs.into_iter().map(|(_, host)| host).collect();
        for mx in &mx_hosts {
            let lowered = mx.to_lowercase();
            if lowered.contains("parking") || lowered.contains("suspended") {
                issues.push(format!("Suspicious MX record: {mx}"));
            }
        }
        details.insert("mxRecords".to_string(), json!(mx_hosts));
    }

    let probe_name = ctx
        .domain
        .sub(&format!("nonexistent-{}", rand::rng().random_range(1000..10_000)));
    let wildcard = ctx
        .client
        .ipv4(&probe_name)
        .await
        .is_ok_and(|ips| !ips.is_empty());
    if wildcard {
        issues.push("Wildcard A record detected - often indicates parking/suspension".to_string());
    }
    details.insert("wildcardDetected".to_string(), json!(wildcard));

    if issues.is_empty() {
        StatusProbe::new(CheckStatus::Pass, "No suspicious DNS patterns detected")
            .with_details(details.into())
    } else {
        StatusProbe::new(
            CheckStatus::Warning,
            format!("Suspicious DNS patterns detected: {} issues", issues.len()),
        )
        .with_issues(issues)
        .with_details(details.into())
    }
}

/// Parking indicators in TXT content or NS hostnames.
async fn parking_probe(ctx: &CheckContext) -> StatusProbe {
    let mut indicators = Vec::new();

    if let Ok(txt_records) = ctx.client.txt(ctx.domain.as_str()).await {
        for txt in txt_records {
            let lowered = txt.to_lowercase();
            if PARKING_TXT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                indicators.push(format!("Parking indicator in TXT: {txt}"));
            }
        }
    }

    if let Ok((hosts, _ttl)) = ctx.client.ns(ctx.domain.as_str()).await {
        for host in hosts {
            let lowered = host.to_lowercase();
            if PARKING_NS_PATTERNS.iter().any(|p| lowered.contains(p)) {
                indicators.push(format!("Parking NS detected: {host}"));
            }
        }
    }

    if indicators.is_empty() {
        StatusProbe::new(CheckStatus::Pass, "No parking indicators detected")
    } else {
        StatusProbe::new(CheckStatus::Warning, "Domain parking detected")
            .with_issues(indicators)
    }
}

/// NXDOMAIN / NODATA / timeout / SERVFAIL on record types every live domain
/// should answer.
async fn error_responses_probe(ctx: &CheckContext) -> StatusProbe {
    let mut patterns = Vec::new();

    for (rtype, missing_message) in [
        (RecordType::A, "domain may not be configured"),
        (RecordType::NS, "critical domain configuration issue"),
        (RecordType::SOA, "domain authority issue"),
    ] {
        match ctx.client.lookup_raw(ctx.domain.as_str(), rtype).await {
            Ok(_) => {}
            Err(err) => match err.kind {
                LookupErrorKind::NxDomain => {
                    patterns.push(format!("NXDOMAIN for {rtype} - domain may be expired"));
                }
                LookupErrorKind::NoData => {
                    patterns.push(format!("No {rtype} records - {missing_message}"));
                }
                LookupErrorKind::Timeout => {
                    patterns.push(format!("Timeout on {rtype} query - DNS server issues"));
                }
                LookupErrorKind::ServFail => {
                    patterns.push(format!("SERVFAIL for {rtype} - authoritative server error"));
                }
                _ => {}
            },
        }
    }

    if patterns.is_empty() {
        StatusProbe::new(CheckStatus::Pass, "No DNS error patterns detected")
    } else {
        StatusProbe::new(
            CheckStatus::Warning,
            format!("DNS errors detected: {} issues", patterns.len()),
        )
        .with_issues(patterns)
    }
}

/// Actionable follow-ups derived from the issues found.
fn recommendations(critical_issues: &[String], warnings: &[String]) -> Vec<String> {
    let all = || critical_issues.iter().chain(warnings.iter());
    let mut recommendations = Vec::new();

    if all().any(|i| {
        let lowered = i.to_lowercase();
        lowered.contains("expired") || lowered.contains("suspended")
    }) {
        recommendations.extend([
            "Check domain registration status with your registrar".to_string(),
            "Verify domain renewal payments are up to date".to_string(),
            "Contact your domain registrar if domain appears suspended".to_string(),
        ]);
    }
    if all().any(|i| i.to_lowercase().contains("ns")) {
        recommendations.extend([
            "Verify nameserver configuration with your DNS provider".to_string(),
            "Check if DNS hosting service is active and paid".to_string(),
            "Test DNS propagation across different locations".to_string(),
        ]);
    }
    if warnings.iter().any(|i| i.to_lowercase().contains("parking")) {
        recommendations.extend([
            "Configure proper web hosting if domain should be active".to_string(),
            "Remove parking service if no longer needed".to_string(),
            "Set up proper A records pointing to your hosting".to_string(),
        ]);
    }
    if warnings.iter().any(|i| {
        let lowered = i.to_lowercase();
        lowered.contains("timeout") || lowered.contains("servfail")
    }) {
        recommendations.extend([
            "DNS server performance issues detected".to_string(),
            "Try switching to different DNS provider".to_string(),
            "Contact DNS hosting provider about server issues".to_string(),
        ]);
    }

    if recommendations.is_empty() {
        recommendations = vec![
            "Domain appears healthy - no immediate action needed".to_string(),
            "Monitor DNS performance regularly".to_string(),
            "Consider implementing DNSSEC for security".to_string(),
        ];
    }
    recommendations
}
