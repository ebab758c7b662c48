//! The individual diagnostic checkers and their dispatch table.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::Domain;
use crate::resolver::DnsClient;
use crate::tld::TldRegistry;
use crate::types::CheckResult;

mod addr;
mod axfr;
mod caa;
mod cname;
mod dkim;
mod dmarc;
mod dnssec;
mod domain_status;
mod glue;
mod mx;
mod ns;
mod ptr;
mod soa;
mod spf;
mod support;
mod txt;
mod wildcard;
mod www;

/// Everything a checker needs: the validated domain plus the shared,
/// immutable resolver facade and TLD registry.
#[derive(Clone)]
pub(crate) struct CheckContext {
    pub domain: Domain,
    pub client: Arc<DnsClient>,
    pub registry: Arc<TldRegistry>,
}

/// The recognized checks, in canonical run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    DomainStatus,
    Ns,
    Soa,
    A,
    Aaaa,
    Mx,
    Spf,
    Txt,
    Cname,
    Ptr,
    Caa,
    Dmarc,
    Dkim,
    Glue,
    Dnssec,
    Axfr,
    Wildcard,
    Www,
}

impl CheckKind {
    /// Every known check, in the order the orchestrator runs them.
    ///
    /// NS precedes GLUE and AXFR, MX precedes PTR; dependents re-run their
    /// prerequisite privately when it was not requested.
    pub const ALL: [Self; 18] = [
        Self::DomainStatus,
        Self::Ns,
        Self::Soa,
        Self::A,
        Self::Aaaa,
        Self::Mx,
        Self::Spf,
        Self::Txt,
        Self::Cname,
        Self::Ptr,
        Self::Caa,
        Self::Dmarc,
        Self::Dkim,
        Self::Glue,
        Self::Dnssec,
        Self::Axfr,
        Self::Wildcard,
        Self::Www,
    ];

    /// The wire name of the check (report key and request token).
    pub fn name(self) -> &'static str {
        match self {
            Self::DomainStatus => "domain_status",
            Self::Ns => "ns",
            Self::Soa => "soa",
            Self::A => "a",
            Self::Aaaa => "aaaa",
            Self::Mx => "mx",
            Self::Spf => "spf",
            Self::Txt => "txt",
            Self::Cname => "cname",
            Self::Ptr => "ptr",
            Self::Caa => "caa",
            Self::Dmarc => "dmarc",
            Self::Dkim => "dkim",
            Self::Glue => "glue",
            Self::Dnssec => "dnssec",
            Self::Axfr => "axfr",
            Self::Wildcard => "wildcard",
            Self::Www => "www",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| format!("Unknown check: {s}"))
    }
}

/// Run one checker to completion, producing its report fragment.
pub(crate) async fn run(kind: CheckKind, ctx: &CheckContext) -> CheckResult {
    match kind {
        CheckKind::DomainStatus => domain_status::check(ctx).await.into(),
        CheckKind::Ns => ns::check(ctx).await.into(),
        CheckKind::Soa => soa::check(ctx).await.into(),
        CheckKind::A => addr::check_a(ctx).await.into(),
        CheckKind::Aaaa => addr::check_aaaa(ctx).await.into(),
        CheckKind::Mx => mx::check(ctx).await.into(),
        CheckKind::Spf => spf::check(ctx).await.into(),
        CheckKind::Txt => txt::check(ctx).await.into(),
        CheckKind::Cname => cname::check(ctx).await.into(),
        CheckKind::Ptr => ptr::check(ctx).await.into(),
        CheckKind::Caa => caa::check(ctx).await.into(),
        CheckKind::Dmarc => dmarc::check(ctx).await.into(),
        CheckKind::Dkim => dkim::check(ctx).await.into(),
        CheckKind::Glue => glue::check(ctx).await.into(),
        CheckKind::Dnssec => dnssec::check(ctx).await.into(),
        CheckKind::Axfr => axfr::check(ctx).await.into(),
        CheckKind::Wildcard => wildcard::check(ctx).await.into(),
        CheckKind::Www => www::check(ctx).await.into(),
    }
}
