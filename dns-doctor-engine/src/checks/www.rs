//! WWW check: follow the `www` CNAME chain to its final address set.

use serde_json::json;

use super::{support, CheckContext};
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, SubCheck, WwwReport};

/// Maximum CNAME hops followed before giving up.
const MAX_CHAIN_DEPTH: usize = 10;

struct ChainResult {
    links: Vec<(String, String)>,
    final_target: String,
    status: CheckStatus,
    message: String,
}

pub(crate) async fn check(ctx: &CheckContext) -> WwwReport {
    let www_host = ctx.domain.sub("www");

    let chain = follow_chain(&ctx.client, &www_host).await;
    let final_ips = ctx
        .client
        .ipv4(&chain.final_target)
        .await
        .map(|ips| ips.iter().map(ToString::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    let ip_check = public_ip_subcheck(&final_ips);

    let chain_details: Vec<_> = chain
        .links
        .iter()
        .map(|(from, to)| json!({ "from": from, "to": to }))
        .collect();
    let a_record_subcheck = SubCheck::info(
        "www_a_record",
        a_record_message(&www_host, &chain, &final_ips),
    )
    .with_details(json!({
        "cnameChain": chain_details,
        "finalIps": final_ips,
    }));

    let cname_subcheck = SubCheck::new("www_cname", chain.status, chain.message.clone());

    let status = if final_ips.is_empty() && chain.links.is_empty() {
        CheckStatus::Error
    } else if matches!(ip_check.status, CheckStatus::Warning | CheckStatus::Error) {
        ip_check.status
    } else {
        CheckStatus::Pass
    };

    WwwReport {
        status,
        checks: vec![a_record_subcheck, ip_check, cname_subcheck],
    }
}

/// Follow CNAMEs from `start`, recording each hop.
async fn follow_chain(client: &DnsClient, start: &str) -> ChainResult {
    let mut links: Vec<(String, String)> = Vec::new();
    let mut current = start.to_string();

    for _ in 0..MAX_CHAIN_DEPTH {
        match client.cname(&current).await {
            Ok(targets) if !targets.is_empty() => {
                let next = targets[0].clone();
                links.push((current.clone(), next.clone()));
                current = next;
            }
            _ => break,
        }
    }

    if links.is_empty() {
        return ChainResult {
            links,
            final_target: start.to_string(),
            status: CheckStatus::Info,
            message: format!("No CNAME record found for {start}"),
        };
    }

    let resolves = client
        .ipv4(&current)
        .await
        .is_ok_and(|ips| !ips.is_empty());
    let (status, message) = if resolves {
        (
            CheckStatus::Pass,
            format!(
                "OK. You do have a CNAME record for {start}. Your CNAME entry also returns the \
                 A record for the CNAME entry, which is good."
            ),
        )
    } else {
        (
            CheckStatus::Warning,
            format!(
                "Warning. CNAME record exists for {start} but final target {current} doesn't \
                 have A records."
            ),
        )
    };

    ChainResult {
        links,
        final_target: current,
        status,
        message,
    }
}

fn a_record_message(www_host: &str, chain: &ChainResult, final_ips: &[String]) -> String {
    if final_ips.is_empty() {
        return format!("Your {www_host} A record is: No A records found");
    }
    let mut path = vec![www_host.to_string()];
    path.extend(chain.links.iter().map(|(_, to)| to.clone()));
    format!(
        "Your {www_host} A record is: {} -> [ {} ]",
        path.join(" -> "),
        final_ips.join(", ")
    )
}

fn public_ip_subcheck(ips: &[String]) -> SubCheck {
    if ips.is_empty() {
        return SubCheck::error("www_ip_public", "No IPs found for WWW subdomain");
    }

    let (public, private): (Vec<&String>, Vec<&String>) = ips
        .iter()
        .partition(|ip| support::ip_str_is_public(ip).unwrap_or(false));

    if private.is_empty() {
        SubCheck::pass(
            "www_ip_public",
            "OK. All of your WWW IPs appear to be public IPs.",
        )
        .with_details(json!({ "publicIps": public, "privateIps": [] }))
    } else if public.is_empty() {
        SubCheck::error(
            "www_ip_public",
            format!(
                "Error. All WWW IPs are private/reserved: {}",
                private
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(json!({ "publicIps": [], "privateIps": private }))
    } else {
        SubCheck::warning(
            "www_ip_public",
            format!(
                "Warning. Some WWW IPs are private/reserved: {}",
                private
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(json!({ "publicIps": public, "privateIps": private }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_public_ip_subcheck_empty() {
        assert_eq!(public_ip_subcheck(&[]).status, CheckStatus::Error);
    }

    #[test]
    fn test_public_ip_subcheck_all_public() {
        let ips = vec!["93.184.216.34".to_string()];
        assert_eq!(public_ip_subcheck(&ips).status, CheckStatus::Pass);
    }

    #[test]
    fn test_public_ip_subcheck_mixed() {
        let ips = vec!["93.184.216.34".to_string(), "10.0.0.1".to_string()];
        let sub = public_ip_subcheck(&ips);
        assert_eq!(sub.status, CheckStatus::Warning);
        assert!(sub.message.contains("10.0.0.1"));
    }

    #[test]
    fn test_public_ip_subcheck_all_private() {
        let ips = vec!["192.168.0.1".to_string(), "127.0.0.1".to_string()];
        assert_eq!(public_ip_subcheck(&ips).status, CheckStatus::Error);
    }

    #[test]
    fn test_a_record_message_without_chain() {
        let chain = ChainResult {
            links: vec![],
            final_target: "www.example.com".to_string(),
            status: CheckStatus::Info,
            message: String::new(),
        };
        let ips = vec!["93.184.216.34".to_string()];
        let message = a_record_message("www.example.com", &chain, &ips);
        assert_eq!(
            message,
            "Your www.example.com A record is: www.example.com -> [ 93.184.216.34 ]"
        );
    }

    #[test]
    fn test_a_record_message_with_chain() {
        let chain = ChainResult {
            links: vec![(
                "www.example.com".to_string(),
                "edge.cdn.example.net".to_string(),
            )],
            final_target: "edge.cdn.example.net".to_string(),
            status: CheckStatus::Pass,
            message: String::new(),
        };
        let ips = vec!["203.0.113.7".to_string()];
        let message = a_record_message("www.example.com", &chain, &ips);
        assert!(message.contains("www.example.com -> edge.cdn.example.net -> [ 203.0.113.7 ]"));
    }

    #[test]
    fn test_a_record_message_no_ips() {
        let chain = ChainResult {
            links: vec![],
            final_target: "www.example.com".to_string(),
            status: CheckStatus::Info,
            message: String::new(),
        };
        let message = a_record_message("www.example.com", &chain, &[]);
        assert!(message.contains("No A records found"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_www_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert_eq!(report.status, CheckStatus::Pass);
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.checks[0].kind, "www_a_record");
        assert_eq!(report.checks[1].kind, "www_ip_public");
        assert_eq!(report.checks[2].kind, "www_cname");
    }
}
