//! Public report model shared by every checker.
//!
//! All types serialize with camelCase fields so the HTTP collaborator can
//! emit a report verbatim as JSON.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::checks::CheckKind;

/// Outcome severity of a check or sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
    Info,
}

impl CheckStatus {
    /// Roll a set of sub-check statuses up into an overall status.
    ///
    /// Any error dominates, then any warning; `info` never demotes.
    pub fn roll_up<I: IntoIterator<Item = Self>>(statuses: I) -> Self {
        let mut overall = Self::Pass;
        for status in statuses {
            match status {
                Self::Error => return Self::Error,
                Self::Warning => overall = Self::Warning,
                Self::Pass | Self::Info => {}
            }
        }
        overall
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Top-level counters; the four buckets partition `total`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub errors: usize,
    pub info: usize,
}

impl Summary {
    /// Count one check result into the summary.
    pub fn record(&mut self, status: CheckStatus) {
        self.total += 1;
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Warning => self.warnings += 1,
            CheckStatus::Error => self.errors += 1,
            CheckStatus::Info => self.info += 1,
        }
    }
}

/// One named diagnostic inside a checker (e.g. `mx_cname_check`).
///
/// `details` is free-form JSON: the payload shape differs per sub-check and
/// is only ever rendered, never interpreted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCheck {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl SubCheck {
    pub fn new(kind: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn pass(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Pass, message)
    }

    pub fn warning(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Warning, message)
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Error, message)
    }

    pub fn info(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, CheckStatus::Info, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Address family tag for resolved IPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrKind {
    V4,
    V6,
}

/// A resolved IP address with its family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    pub kind: AddrKind,
    pub address: String,
}

impl From<IpAddr> for IpAddress {
    fn from(ip: IpAddr) -> Self {
        Self {
            kind: match ip {
                IpAddr::V4(_) => AddrKind::V4,
                IpAddr::V6(_) => AddrKind::V6,
            },
            address: ip.to_string(),
        }
    }
}

/// Where an NS record was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NsSource {
    /// Authority section of the parent TLD server.
    Parent,
    /// Recursive NS lookup against the zone itself.
    Domain,
}

/// A nameserver for the analyzed domain, enriched with its addresses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NsRecord {
    pub host: String,
    pub ips: Vec<IpAddress>,
    pub ttl: Option<u32>,
    pub source: NsSource,
}

/// Parsed SOA rdata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoaRecord {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: i32,
    pub retry: i32,
    pub expire: i32,
    pub minimum: u32,
}

/// A mail exchanger with its resolved addresses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MxRecord {
    pub host: String,
    pub priority: u16,
    pub ips: Vec<IpAddress>,
    /// Set when the exchange failed to resolve to any address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ─── NS check ──────────────────────────────────────────────

/// NS RRset read from the parent TLD authority section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentDelegation {
    pub status: CheckStatus,
    /// NS target hostnames, trailing dot stripped.
    pub records: Vec<String>,
    /// Per-hostname addresses: additional-section glue where the TLD served
    /// it, recursive resolution otherwise.
    pub nameserver_ips: BTreeMap<String, Vec<String>>,
    /// Addresses taken verbatim from the additional section (true glue).
    pub glue: BTreeMap<String, Vec<String>>,
    pub tld_server_used: Option<String>,
    pub tld_server_ip: Option<String>,
    /// TTL of the authority RRset.
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// NS RRset seen through the recursive resolver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainNameservers {
    pub status: CheckStatus,
    pub records: Vec<String>,
    pub nameserver_ips: BTreeMap<String, Vec<String>>,
    pub ttl: Option<u32>,
    pub resolver_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parent-vs-domain NS set comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NsComparison {
    #[serde(rename = "match")]
    pub matches: bool,
    pub parent_count: usize,
    pub domain_count: usize,
    pub only_in_parent: Vec<String>,
    pub only_in_domain: Vec<String>,
}

/// Full NS check result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NsReport {
    pub status: CheckStatus,
    pub count: usize,
    pub records: Vec<NsRecord>,
    pub parent_delegation: ParentDelegation,
    pub domain_nameservers: DomainNameservers,
    pub comparisons: NsComparison,
    pub parent_server: Option<String>,
    /// True when any listed nameserver came with at least one address.
    pub glue_records: bool,
    pub checks: Vec<SubCheck>,
}

// ─── SOA check ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoaReport {
    pub status: CheckStatus,
    pub record: Option<SoaRecord>,
    pub checks: Vec<SubCheck>,
}

// ─── A / AAAA checks ───────────────────────────────────────

/// Addresses found for one hostname.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAddresses {
    pub status: CheckStatus,
    pub records: Vec<String>,
    pub issues: Vec<String>,
    pub count: usize,
}

/// Root and `www` address results for one family.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecords {
    pub root: HostAddresses,
    pub www: HostAddresses,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressReport {
    pub status: CheckStatus,
    pub records: AddressRecords,
    pub issues: Vec<String>,
}

// ─── MX check ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MxReport {
    pub status: CheckStatus,
    /// Sorted by ascending priority; duplicates are kept.
    pub records: Vec<MxRecord>,
    pub checks: Vec<SubCheck>,
    pub count: usize,
}

// ─── SPF check ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpfReport {
    pub status: CheckStatus,
    pub record: String,
    pub issues: Vec<String>,
    /// Count of DNS-lookup mechanisms; `None` when no SPF record exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_lookups: Option<u32>,
}

// ─── TXT check ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxtCategories {
    pub spf: Vec<String>,
    pub dmarc: Vec<String>,
    pub dkim: Vec<String>,
    pub verification: Vec<String>,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxtReport {
    pub status: CheckStatus,
    pub records: Vec<String>,
    pub categorized: TxtCategories,
    pub issues: Vec<String>,
    pub count: usize,
}

// ─── CNAME check ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CnameHost {
    pub status: CheckStatus,
    pub target: String,
    pub resolves: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CnameReport {
    pub status: CheckStatus,
    /// Keyed by probed subdomain label.
    pub records: BTreeMap<String, CnameHost>,
    pub issues: Vec<String>,
}

// ─── PTR check ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PtrEntry {
    pub ip: String,
    pub mx_host: String,
    pub status: CheckStatus,
    pub ptr: Option<String>,
    pub matches_mx: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PtrReport {
    pub status: CheckStatus,
    pub records: Vec<PtrEntry>,
    pub issues: Vec<String>,
}

// ─── CAA check ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaaRecord {
    pub record: String,
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaaReport {
    pub status: CheckStatus,
    pub records: Vec<CaaRecord>,
    pub issues: Vec<String>,
}

// ─── DMARC / DKIM checks ───────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmarcReport {
    pub status: CheckStatus,
    pub record: String,
    pub parsed: BTreeMap<String, String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimSelectorRecord {
    pub selector: String,
    pub record: String,
    pub parsed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimReport {
    pub status: CheckStatus,
    pub records: Vec<DkimSelectorRecord>,
    pub issues: Vec<String>,
}

// ─── GLUE check ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlueEntry {
    pub nameserver: String,
    pub needs_glue: bool,
    pub has_glue: bool,
    pub glue_records: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlueReport {
    pub status: CheckStatus,
    pub records: Vec<GlueEntry>,
    pub issues: Vec<String>,
}

// ─── DNSSEC check ──────────────────────────────────────────

/// Presence record for one DNSSEC rrtype (no cryptographic validation).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnssecRecordPresence {
    #[serde(rename = "type")]
    pub kind: String,
    pub record: String,
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnssecReport {
    pub status: CheckStatus,
    pub records: Vec<DnssecRecordPresence>,
    pub issues: Vec<String>,
}

// ─── AXFR check ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxfrServer {
    pub nameserver: String,
    pub ip: String,
    pub vulnerable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxfrReport {
    pub status: CheckStatus,
    /// True when at least one server allowed a transfer.
    pub open: bool,
    pub servers: Vec<AxfrServer>,
    pub issues: Vec<String>,
}

// ─── WILDCARD check ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WildcardProbe {
    pub subdomain: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub has_record: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WildcardReport {
    pub status: CheckStatus,
    pub records: Vec<WildcardProbe>,
    pub has_wildcard: bool,
    pub issues: Vec<String>,
}

// ─── WWW check ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WwwReport {
    pub status: CheckStatus,
    pub checks: Vec<SubCheck>,
}

// ─── DOMAIN_STATUS check ───────────────────────────────────

/// One liveness probe inside the domain-status composite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusProbe {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl StatusProbe {
    pub fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            issues: Vec::new(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusChecks {
    pub ns_resolution: StatusProbe,
    pub authoritative_response: StatusProbe,
    pub suspicious_patterns: StatusProbe,
    pub parking_detection: StatusProbe,
    pub error_responses: StatusProbe,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusReport {
    pub status: CheckStatus,
    pub message: String,
    pub detailed_checks: DomainStatusChecks,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

// ─── Failure / result / report ─────────────────────────────

/// Replacement result for a checker that panicked, timed out, or otherwise
/// failed wholesale. Other checks continue unaffected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFailure {
    pub status: CheckStatus,
    pub records: Vec<String>,
    pub issues: Vec<String>,
}

impl CheckFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            records: Vec::new(),
            issues: vec![reason.into()],
        }
    }
}

/// The uniform per-check result: one variant per checker payload shape.
///
/// Serialized untagged -- the JSON shape is whatever the payload struct
/// defines, always including a `status` field.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckResult {
    Ns(NsReport),
    Soa(SoaReport),
    Addresses(AddressReport),
    Mx(MxReport),
    Spf(SpfReport),
    Txt(TxtReport),
    Cname(CnameReport),
    Ptr(PtrReport),
    Caa(CaaReport),
    Dmarc(DmarcReport),
    Dkim(DkimReport),
    Glue(GlueReport),
    Dnssec(DnssecReport),
    Axfr(AxfrReport),
    Wildcard(WildcardReport),
    Www(WwwReport),
    DomainStatus(DomainStatusReport),
    Failed(CheckFailure),
}

impl CheckResult {
    /// Overall status of this check, whatever the payload shape.
    pub fn status(&self) -> CheckStatus {
        match self {
            Self::Ns(r) => r.status,
            Self::Soa(r) => r.status,
            Self::Addresses(r) => r.status,
            Self::Mx(r) => r.status,
            Self::Spf(r) => r.status,
            Self::Txt(r) => r.status,
            Self::Cname(r) => r.status,
            Self::Ptr(r) => r.status,
            Self::Caa(r) => r.status,
            Self::Dmarc(r) => r.status,
            Self::Dkim(r) => r.status,
            Self::Glue(r) => r.status,
            Self::Dnssec(r) => r.status,
            Self::Axfr(r) => r.status,
            Self::Wildcard(r) => r.status,
            Self::Www(r) => r.status,
            Self::DomainStatus(r) => r.status,
            Self::Failed(r) => r.status,
        }
    }
}

macro_rules! impl_from_report {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for CheckResult {
            fn from(report: $ty) -> Self {
                Self::$variant(report)
            }
        })*
    };
}

impl_from_report! {
    Ns => NsReport,
    Soa => SoaReport,
    Addresses => AddressReport,
    Mx => MxReport,
    Spf => SpfReport,
    Txt => TxtReport,
    Cname => CnameReport,
    Ptr => PtrReport,
    Caa => CaaReport,
    Dmarc => DmarcReport,
    Dkim => DkimReport,
    Glue => GlueReport,
    Dnssec => DnssecReport,
    Axfr => AxfrReport,
    Wildcard => WildcardReport,
    Www => WwwReport,
    DomainStatus => DomainStatusReport,
    Failed => CheckFailure,
}

/// Ordered check-name → result mapping.
///
/// Serialized as a JSON object whose key order is the orchestrator's run
/// order, which a plain map type would not preserve.
#[derive(Debug, Clone, Default)]
pub struct CheckMap(Vec<(CheckKind, CheckResult)>);

impl CheckMap {
    pub fn push(&mut self, kind: CheckKind, result: CheckResult) {
        self.0.push((kind, result));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.0.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CheckKind, CheckResult)> {
        self.0.iter()
    }
}

impl Serialize for CheckMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, result) in &self.0 {
            map.serialize_entry(kind.name(), result)?;
        }
        map.end()
    }
}

/// The complete analysis report for one domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub domain: String,
    /// ISO-8601 UTC timestamp of when the analysis started.
    pub timestamp: String,
    /// Always `"completed"`; individual checks carry their own failures.
    pub status: String,
    pub checks: CheckMap,
    pub summary: Summary,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_up_error_dominates() {
        let statuses = [CheckStatus::Pass, CheckStatus::Warning, CheckStatus::Error];
        assert_eq!(CheckStatus::roll_up(statuses), CheckStatus::Error);
    }

    #[test]
    fn test_roll_up_warning_beats_pass() {
        let statuses = [CheckStatus::Pass, CheckStatus::Warning, CheckStatus::Pass];
        assert_eq!(CheckStatus::roll_up(statuses), CheckStatus::Warning);
    }

    #[test]
    fn test_roll_up_info_does_not_demote() {
        let statuses = [CheckStatus::Pass, CheckStatus::Info];
        assert_eq!(CheckStatus::roll_up(statuses), CheckStatus::Pass);
    }

    #[test]
    fn test_roll_up_empty_is_pass() {
        assert_eq!(CheckStatus::roll_up([]), CheckStatus::Pass);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(CheckStatus::Pass).unwrap(), "pass");
        assert_eq!(
            serde_json::to_value(CheckStatus::Warning).unwrap(),
            "warning"
        );
    }

    #[test]
    fn test_summary_partitions_total() {
        let mut summary = Summary::default();
        summary.record(CheckStatus::Pass);
        summary.record(CheckStatus::Pass);
        summary.record(CheckStatus::Error);
        summary.record(CheckStatus::Info);
        summary.record(CheckStatus::Warning);
        assert_eq!(summary.total, 5);
        assert_eq!(
            summary.passed + summary.warnings + summary.errors + summary.info,
            summary.total
        );
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_subcheck_serializes_type_field() {
        let sub = SubCheck::pass("mx_count", "Good. You have 2 MX records.")
            .with_details(serde_json::json!({"count": 2}));
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["type"], "mx_count");
        assert_eq!(json["status"], "pass");
        assert_eq!(json["details"]["count"], 2);
    }

    #[test]
    fn test_subcheck_omits_missing_details() {
        let sub = SubCheck::error("same_class", "Not all NS records are class IN");
        let json = serde_json::to_value(&sub).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_ip_address_from_ipaddr() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let ip = IpAddress::from(v4);
        assert_eq!(ip.kind, AddrKind::V4);
        assert_eq!(ip.address, "192.0.2.1");

        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        let ip = IpAddress::from(v6);
        assert_eq!(ip.kind, AddrKind::V6);
    }

    #[test]
    fn test_ns_source_serialization() {
        assert_eq!(serde_json::to_value(NsSource::Parent).unwrap(), "parent");
        assert_eq!(serde_json::to_value(NsSource::Domain).unwrap(), "domain");
    }

    #[test]
    fn test_check_map_preserves_insertion_order() {
        let mut map = CheckMap::default();
        map.push(CheckKind::Ns, CheckFailure::new("a").into());
        map.push(CheckKind::DomainStatus, CheckFailure::new("b").into());
        map.push(CheckKind::Mx, CheckFailure::new("c").into());

        let json = serde_json::to_string(&map).unwrap();
        let ns_pos = json.find("\"ns\"").unwrap();
        let status_pos = json.find("\"domain_status\"").unwrap();
        let mx_pos = json.find("\"mx\"").unwrap();
        assert!(ns_pos < status_pos);
        assert!(status_pos < mx_pos);
    }

    #[test]
    fn test_check_map_get() {
        let mut map = CheckMap::default();
        map.push(CheckKind::Ns, CheckFailure::new("boom").into());
        assert!(map.get(CheckKind::Ns).is_some());
        assert!(map.get(CheckKind::Mx).is_none());
    }

    #[test]
    fn test_check_failure_shape() {
        let failure = CheckFailure::new("Check failed: timeout");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["records"], serde_json::json!([]));
        assert_eq!(json["issues"][0], "Check failed: timeout");
    }

    #[test]
    fn test_check_result_untagged_serialization() {
        let result: CheckResult = CheckFailure::new("nope").into();
        let json = serde_json::to_value(&result).unwrap();
        // Untagged: no enum wrapper object
        assert!(json.get("Failed").is_none());
        assert_eq!(json["status"], "error");
        assert_eq!(result.status(), CheckStatus::Error);
    }

    #[test]
    fn test_mx_record_omits_missing_error() {
        let mx = MxRecord {
            host: "mail.example.com".to_string(),
            priority: 10,
            ips: vec![],
            error: None,
        };
        let json = serde_json::to_value(&mx).unwrap();
        assert!(json.get("error").is_none());
    }
}
