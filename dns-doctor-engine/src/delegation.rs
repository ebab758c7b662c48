//! Parent delegation probe: what the TLD says about a child zone.
//!
//! TLD servers are not authoritative for the domains they delegate, so the
//! NS RRset arrives in the *authority* section of a non-recursive reply.

use futures::stream::{self, StreamExt};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use crate::domain::Domain;
use crate::resolver::DnsClient;
use crate::tld::TldRegistry;
use crate::types::{CheckStatus, ParentDelegation};

/// Concurrent glue lookups per probe.
const GLUE_FANOUT: usize = 8;

/// Query a TLD authority for the domain's delegation.
///
/// Picks a random TLD server; on a transport failure, one other server from
/// the registry is tried. Total failure yields an error-status result with
/// an empty record list, never an `Err`.
pub async fn probe(domain: &Domain, registry: &TldRegistry, client: &DnsClient) -> ParentDelegation {
    let tld = domain.tld();

    let Some((first_host, first_ip)) = registry.pick_authority(tld) else {
        return failed(format!("TLD {tld} not found in registry"));
    };

    match query_delegation(domain, client, &first_host, first_ip).await {
        Ok(result) => result,
        Err(first_err) => {
            log::debug!("TLD server {first_host} failed for {domain}: {first_err}");
            let retry = registry.pick_authority_excluding(tld, Some(first_ip));
            match retry {
                Some((host, ip)) if ip != first_ip => {
                    match query_delegation(domain, client, &host, ip).await {
                        Ok(result) => result,
                        Err(err) => failed(format!(
                            "TLD servers did not respond: {first_host} ({first_err}), {host} ({err})"
                        )),
                    }
                }
                _ => failed(format!("TLD server {first_host} did not respond: {first_err}")),
            }
        }
    }
}

async fn query_delegation(
    domain: &Domain,
    client: &DnsClient,
    server_host: &str,
    server_ip: Ipv4Addr,
) -> Result<ParentDelegation, crate::error::LookupError> {
    let response = client
        .query_at(
            IpAddr::V4(server_ip),
            domain.as_str(),
            RecordType::NS,
            false,
        )
        .await?;

    if response.response_code != ResponseCode::NoError {
        let code_label = match response.response_code {
            ResponseCode::NXDomain => "NXDOMAIN".to_string(),
            ResponseCode::ServFail => "SERVFAIL".to_string(),
            ResponseCode::Refused => "REFUSED".to_string(),
            code => code.to_string(),
        };
        return Ok(ParentDelegation {
            status: CheckStatus::Error,
            records: Vec::new(),
            nameserver_ips: BTreeMap::new(),
            glue: BTreeMap::new(),
            tld_server_used: Some(server_host.to_string()),
            tld_server_ip: Some(server_ip.to_string()),
            ttl: None,
            error: Some(format!(
                "TLD server {server_host} answered {code_label} for {domain}"
            )),
        });
    }

    let ttl = response.authorities.first().map(|r| r.ttl());
    let mut records: Vec<String> = Vec::new();
    for record in &response.authorities {
        if let Some(ns) = record.data().as_ns() {
            let host = ns.0.to_string().trim_end_matches('.').to_ascii_lowercase();
            if !records.contains(&host) {
                records.push(host);
            }
        }
    }

    // Glue proper lives in the additional section; only hosts the TLD did
    // not provide glue for are resolved through the recursive facade.
    let mut nameserver_ips: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in &response.additionals {
        if let Some(a) = record.data().as_a() {
            let owner = record.name().to_string().trim_end_matches('.').to_ascii_lowercase();
            if records.contains(&owner) {
                nameserver_ips.entry(owner).or_default().push(a.0.to_string());
            }
        }
    }
    let glue = nameserver_ips.clone();
    let unglued: Vec<String> = records
        .iter()
        .filter(|host| !nameserver_ips.contains_key(*host))
        .cloned()
        .collect();
    nameserver_ips.extend(resolve_glue(client, &unglued).await);

    let status = if records.is_empty() {
        CheckStatus::Error
    } else {
        CheckStatus::Pass
    };
    let error = records
        .is_empty()
        .then(|| format!("TLD server {server_host} returned no delegation for {domain}"));

    Ok(ParentDelegation {
        status,
        records,
        nameserver_ips,
        glue,
        tld_server_used: Some(server_host.to_string()),
        tld_server_ip: Some(server_ip.to_string()),
        ttl,
        error,
    })
}

/// Resolve A records for each delegated nameserver (bounded fan-out).
async fn resolve_glue(client: &DnsClient, hosts: &[String]) -> BTreeMap<String, Vec<String>> {
    stream::iter(hosts.iter().cloned())
        .map(|host| async move {
            let ips = client
                .ipv4(&host)
                .await
                .map(|addrs| addrs.iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            (host, ips)
        })
        .buffered(GLUE_FANOUT)
        .collect()
        .await
}

fn failed(error: String) -> ParentDelegation {
    ParentDelegation {
        status: CheckStatus::Error,
        records: Vec::new(),
        nameserver_ips: BTreeMap::new(),
        glue: BTreeMap::new(),
        tld_server_used: None,
        tld_server_ip: None,
        ttl: None,
        error: Some(error),
    }
}
