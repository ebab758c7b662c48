//! Async DNS health analysis engine.
//!
//! Given a registered domain name, the engine probes the public DNS hierarchy
//! and produces a structured report covering:
//!
//! - **Delegation** -- NS records at the parent TLD vs. the zone itself, glue,
//!   subnet diversity, open recursion
//! - **Authority health** -- SOA timer sanity, serial consistency across
//!   nameservers
//! - **Mail infrastructure** -- MX sanity, SPF/DMARC/DKIM, reverse DNS for
//!   mail exchangers
//! - **Security posture** -- DNSSEC deployment (presence only), CAA, zone
//!   transfer exposure
//! - **Liveness** -- wildcard detection, parking/suspension signals, www
//!   resolution
//!
//! Every check degrades gracefully: lookup failures become diagnostic issues
//! inside the report rather than errors out of the engine. Only an invalid
//! input domain short-circuits the whole analysis.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dns_doctor_engine::AnalyzerEngine;
//!
//! # async fn example() -> dns_doctor_engine::EngineResult<()> {
//! let engine = AnalyzerEngine::with_builtin_registry();
//!
//! // Run every check.
//! let report = engine.analyze("example.com", &[]).await?;
//! println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
//!
//! // Run a subset.
//! let subset = vec!["ns".to_string(), "mx".to_string()];
//! let report = engine.analyze("example.com", &subset).await?;
//! assert_eq!(report.summary.total, report.checks.len());
//! # Ok(())
//! # }
//! ```

mod checks;
mod delegation;
mod domain;
mod error;
mod orchestrator;
mod resolver;
mod tld;
mod types;

pub use checks::CheckKind;
pub use domain::Domain;
pub use error::{EngineError, EngineResult, LookupError, LookupErrorKind, LookupResult};
pub use orchestrator::AnalyzerEngine;
pub use resolver::{DnsClient, RawResponse};
pub use tld::{TldEntry, TldNameserver, TldRegistry};
pub use types::{
    AddrKind, AddressRecords, AddressReport, AxfrReport, AxfrServer, CaaRecord, CaaReport,
    CheckFailure, CheckMap, CheckResult, CheckStatus, CnameHost, CnameReport, DkimReport,
    DkimSelectorRecord, DmarcReport, DnssecRecordPresence, DnssecReport, DomainNameservers,
    DomainStatusChecks, DomainStatusReport, GlueEntry, GlueReport, HostAddresses, IpAddress,
    MxRecord, MxReport, NsComparison, NsRecord, NsReport, NsSource, ParentDelegation, PtrEntry,
    PtrReport, Report, SoaRecord, SoaReport, SpfReport, StatusProbe, SubCheck, Summary,
    TxtCategories, TxtReport, WildcardProbe, WildcardReport, WwwReport,
};
