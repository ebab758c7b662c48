//! SOA check: timer sanity and serial agreement across nameservers.

use futures::stream::{self, StreamExt};
use serde_json::json;

use super::CheckContext;
use crate::types::{CheckStatus, SoaReport, SubCheck};

/// Nameservers queried for serial agreement.
const SERIAL_PROBE_LIMIT: usize = 5;

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> SoaReport {
    let soa = match ctx.client.soa(ctx.domain.as_str()).await {
        Ok(soa) => soa,
        Err(err) => {
            return SoaReport {
                status: CheckStatus::Error,
                record: None,
                checks: vec![SubCheck::error(
                    "soa_record",
                    format!("Failed to query SOA record: {err}"),
                )],
            };
        }
    };

    let mut checks = vec![SubCheck::info("soa_record", "SOA record found").with_details(json!({
        "mname": soa.mname,
        "rname": soa.rname,
        "serial": soa.serial,
        "refresh": soa.refresh,
        "retry": soa.retry,
        "expire": soa.expire,
        "minimum": soa.minimum,
    }))];

    checks.push(serial_consistency_subcheck(ctx, soa.serial).await);
    checks.push(range_subcheck(
        "soa_refresh",
        "SOA REFRESH interval",
        i64::from(soa.refresh),
        3_600,
        86_400,
    ));
    checks.push(range_subcheck(
        "soa_retry",
        "SOA RETRY interval",
        i64::from(soa.retry),
        1_800,
        7_200,
    ));
    checks.push(range_subcheck(
        "soa_expire",
        "SOA EXPIRE time",
        i64::from(soa.expire),
        604_800,
        2_419_200,
    ));
    checks.push(range_subcheck(
        "soa_minimum",
        "SOA MINIMUM (default TTL)",
        i64::from(soa.minimum),
        300,
        86_400,
    ));

    let status = CheckStatus::roll_up(checks.iter().map(|c| c.status));
    SoaReport {
        status,
        record: Some(soa),
        checks,
    }
}

/// All nameservers must agree on one serial; split-brain zones misbehave in
/// hard-to-debug ways.
async fn serial_consistency_subcheck(ctx: &CheckContext, expected: u32) -> SubCheck {
    let Ok((hosts, _ttl)) = ctx.client.ns(ctx.domain.as_str()).await else {
        return SubCheck::info("soa_serial_consistency", "Could not check SOA serial consistency");
    };

    let client = &ctx.client;
    let domain = &ctx.domain;
    let serials: Vec<(String, Option<u32>)> = stream::iter(hosts.into_iter().take(SERIAL_PROBE_LIMIT))
        .map(|host| async move {
            let serial = match client.ipv4(&host).await {
                Ok(ips) => match ips.first() {
                    Some(ip) => client
                        .soa_serial_at(std::net::IpAddr::V4(*ip), domain.as_str())
                        .await
                        .ok()
                        .flatten(),
                    None => None,
                },
                Err(_) => None,
            };
            (host, serial)
        })
        .buffered(FANOUT)
        .collect()
        .await;

    let mut unique: Vec<u32> = serials.iter().filter_map(|(_, s)| *s).collect();
    unique.sort_unstable();
    unique.dedup();

    let details: serde_json::Value = serials
        .iter()
        .map(|(host, serial)| (host.clone(), json!(serial)))
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into();

    match unique.len() {
        1 => SubCheck::pass(
            "soa_serial_consistency",
            format!("OK. All of your nameservers agree that your SOA serial number is {expected}"),
        )
        .with_details(details),
        0 => SubCheck::warning(
            "soa_serial_consistency",
            "Could not verify SOA serial consistency across all nameservers",
        )
        .with_details(details),
        _ => SubCheck::error(
            "soa_serial_consistency",
            format!(
                "ERROR: SOA serial number mismatch across nameservers. Found serials: {unique:?}"
            ),
        )
        .with_details(details),
    }
}

/// Pass inside the recommended range, warn outside it.
fn range_subcheck(kind: &str, label: &str, value: i64, min: i64, max: i64) -> SubCheck {
    if (min..=max).contains(&value) {
        SubCheck::pass(kind, format!("Your {label} is: {value}. That is OK."))
            .with_details(json!({ "value": value, "recommendedMin": min, "recommendedMax": max }))
    } else if value < min {
        SubCheck::warning(
            kind,
            format!("Your {label} is: {value}. This is too low (recommended: {min}-{max})."),
        )
        .with_details(json!({ "value": value, "issue": "too_low" }))
    } else {
        SubCheck::warning(
            kind,
            format!("Your {label} is: {value}. This is higher than recommended."),
        )
        .with_details(json!({ "value": value, "issue": "too_high" }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_subcheck_inside() {
        let sub = range_subcheck("soa_refresh", "SOA REFRESH interval", 7200, 3600, 86_400);
        assert_eq!(sub.status, CheckStatus::Pass);
        assert!(sub.message.contains("7200"));
    }

    #[test]
    fn test_range_subcheck_boundaries_inclusive() {
        assert_eq!(
            range_subcheck("soa_refresh", "x", 3600, 3600, 86_400).status,
            CheckStatus::Pass
        );
        assert_eq!(
            range_subcheck("soa_refresh", "x", 86_400, 3600, 86_400).status,
            CheckStatus::Pass
        );
    }

    #[test]
    fn test_range_subcheck_too_low() {
        let sub = range_subcheck("soa_retry", "SOA RETRY interval", 60, 1800, 7200);
        assert_eq!(sub.status, CheckStatus::Warning);
        assert!(sub.message.contains("too low"));
        assert_eq!(sub.details.unwrap()["issue"], "too_low");
    }

    #[test]
    fn test_range_subcheck_too_high() {
        let sub = range_subcheck("soa_expire", "SOA EXPIRE time", 9_999_999, 604_800, 2_419_200);
        assert_eq!(sub.status, CheckStatus::Warning);
        assert!(sub.message.contains("higher than recommended"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_soa_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::builtin()),
        };
        let report = check(&ctx).await;
        assert!(report.record.is_some());
        assert_eq!(report.checks[0].kind, "soa_record");
        assert!(report
            .checks
            .iter()
            .any(|c| c.kind == "soa_serial_consistency"));
    }
}
