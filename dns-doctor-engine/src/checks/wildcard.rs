//! WILDCARD check: does every made-up subdomain resolve?

use futures::stream::{self, StreamExt};
use rand::Rng;

use super::CheckContext;
use crate::resolver::DnsClient;
use crate::types::{CheckStatus, WildcardProbe, WildcardReport};

/// Concurrent sub-queries inside this check.
const FANOUT: usize = 8;

pub(crate) async fn check(ctx: &CheckContext) -> WildcardReport {
    let random_label = format!("randomtest{}", rand::rng().random_range(1000..10_000));
    let probes = [
        ctx.domain.sub(&random_label),
        ctx.domain.sub("nonexistent-subdomain"),
        ctx.domain.sub("test-wildcard"),
    ];

    let client = &ctx.client;
    let records: Vec<WildcardProbe> = stream::iter(
        probes
            .iter()
            .flat_map(|name| [("A", name.clone()), ("AAAA", name.clone())]),
    )
    .map(|(kind, name): (&str, String)| probe(client, kind, name))
    .buffered(FANOUT)
    .collect()
    .await;

    let has_wildcard = records.iter().any(|p| p.has_record);
    let (status, issues) = if has_wildcard {
        (
            CheckStatus::Warning,
            vec![
                "Wildcard DNS records detected. This means any subdomain will resolve."
                    .to_string(),
                "This can be useful for catch-all setups but may have security implications."
                    .to_string(),
            ],
        )
    } else {
        (
            CheckStatus::Pass,
            vec!["No wildcard DNS records detected.".to_string()],
        )
    };

    WildcardReport {
        status,
        records,
        has_wildcard,
        issues,
    }
}

async fn probe(client: &DnsClient, kind: &str, name: String) -> WildcardProbe {
    let value = match kind {
        "A" => client
            .ipv4(&name)
            .await
            .ok()
            .and_then(|ips| ips.first().map(ToString::to_string)),
        _ => client
            .ipv6(&name)
            .await
            .ok()
            .and_then(|ips| ips.first().map(ToString::to_string)),
    };
    WildcardProbe {
        subdomain: name,
        kind: kind.to_string(),
        has_record: value.is_some(),
        value,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_wildcard_check_plain_zone() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("example.com").unwrap(),
            client: std::sync::Arc::new(DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        assert!(!report.has_wildcard);
        assert_eq!(report.status, CheckStatus::Pass);
        // Three names probed for two record types each
        assert_eq!(report.records.len(), 6);
    }
}
