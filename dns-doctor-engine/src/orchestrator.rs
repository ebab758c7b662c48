//! Check orchestration: fan-out, deadlines, and report assembly.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::time::timeout;

use crate::checks::{self, CheckContext, CheckKind};
use crate::domain::Domain;
use crate::error::EngineResult;
use crate::resolver::DnsClient;
use crate::tld::TldRegistry;
use crate::types::{CheckFailure, CheckMap, CheckResult, Report, Summary};

/// Hard ceiling for a single checker.
const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-report deadline for a full run.
const FULL_RUN_DEADLINE: Duration = Duration::from_secs(120);

/// Whole-report deadline when a specific subset was requested.
const SUBSET_RUN_DEADLINE: Duration = Duration::from_secs(60);

/// The analysis engine: one instance serves one request at a time, sharing
/// only the immutable TLD registry and the resolver facade.
pub struct AnalyzerEngine {
    client: Arc<DnsClient>,
    registry: Arc<TldRegistry>,
}

impl AnalyzerEngine {
    /// Build an engine around a loaded TLD registry.
    pub fn new(registry: TldRegistry) -> Self {
        Self {
            client: Arc::new(DnsClient::new()),
            registry: Arc::new(registry),
        }
    }

    /// Build an engine using the embedded starter TLD data.
    pub fn with_builtin_registry() -> Self {
        Self::new(TldRegistry::builtin())
    }

    /// Build an engine from pre-shared parts (e.g. one registry shared by
    /// many engines).
    pub fn from_parts(client: Arc<DnsClient>, registry: Arc<TldRegistry>) -> Self {
        Self { client, registry }
    }

    /// Analyze `domain`, running `requested` checks (empty means all).
    ///
    /// Unknown check names are silently dropped. Only an invalid domain
    /// produces an `Err`; every other failure is folded into the report.
    pub async fn analyze(&self, domain: &str, requested: &[String]) -> EngineResult<Report> {
        let domain = Domain::parse(domain)?;
        let selected = select_checks(requested);
        let deadline = if requested.is_empty() {
            FULL_RUN_DEADLINE
        } else {
            SUBSET_RUN_DEADLINE
        };
        let per_check = CHECK_TIMEOUT.min(deadline);

        log::info!(
            "Analyzing {domain}: running {} checks with a {}s deadline",
            selected.len(),
            deadline.as_secs()
        );

        let ctx = CheckContext {
            domain: domain.clone(),
            client: Arc::clone(&self.client),
            registry: Arc::clone(&self.registry),
        };

        // Fan every checker out as its own task; assembly below restores the
        // canonical order regardless of completion order
        let handles: Vec<(CheckKind, tokio::task::JoinHandle<CheckResult>)> = selected
            .iter()
            .map(|kind| {
                let kind = *kind;
                let ctx = ctx.clone();
                let handle = tokio::spawn(async move {
                    match timeout(per_check, checks::run(kind, &ctx)).await {
                        Ok(result) => result,
                        Err(_) => {
                            log::warn!("Check {kind} timed out after {}s", per_check.as_secs());
                            CheckFailure::new(format!(
                                "Check timed out after {}s",
                                per_check.as_secs()
                            ))
                            .into()
                        }
                    }
                });
                (kind, handle)
            })
            .collect();

        let mut check_map = CheckMap::default();
        let mut summary = Summary::default();
        for (kind, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                // A panicking checker poisons only its own entry
                Err(err) => {
                    log::error!("Check {kind} aborted: {err}");
                    CheckFailure::new(format!("Check failed: {err}")).into()
                }
            };
            summary.record(result.status());
            check_map.push(kind, result);
        }

        log::info!(
            "Analysis of {domain} complete: {} passed, {} warnings, {} errors, {} info",
            summary.passed,
            summary.warnings,
            summary.errors,
            summary.info
        );

        Ok(Report {
            domain: domain.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status: "completed".to_string(),
            checks: check_map,
            summary,
        })
    }
}

/// Map requested names onto the canonical check list.
///
/// Unknown names are dropped; the result follows canonical declaration
/// order, not request order, and never contains duplicates.
fn select_checks(requested: &[String]) -> Vec<CheckKind> {
    if requested.is_empty() {
        return CheckKind::ALL.to_vec();
    }
    let wanted: Vec<CheckKind> = requested
        .iter()
        .filter_map(|name| CheckKind::from_str(name).ok())
        .collect();
    CheckKind::ALL
        .into_iter()
        .filter(|kind| wanted.contains(kind))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_select_checks_empty_means_all() {
        assert_eq!(select_checks(&[]), CheckKind::ALL.to_vec());
    }

    #[test]
    fn test_select_checks_drops_unknown_names() {
        let selected = select_checks(&names(&["ns", "bogus", "mx"]));
        assert_eq!(selected, vec![CheckKind::Ns, CheckKind::Mx]);
    }

    #[test]
    fn test_select_checks_canonical_order_wins() {
        // Requested out of order; canonical order prevails
        let selected = select_checks(&names(&["www", "ns", "mx"]));
        assert_eq!(selected, vec![CheckKind::Ns, CheckKind::Mx, CheckKind::Www]);
    }

    #[test]
    fn test_select_checks_deduplicates() {
        let selected = select_checks(&names(&["ns", "ns", "NS"]));
        assert_eq!(selected, vec![CheckKind::Ns]);
    }

    #[test]
    fn test_select_checks_all_unknown_yields_empty() {
        let selected = select_checks(&names(&["nope", "nada"]));
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_domain() {
        let engine = AnalyzerEngine::new(TldRegistry::empty());
        let result = engine.analyze("", &[]).await;
        assert!(matches!(result, Err(EngineError::InvalidDomain(_))));
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_label() {
        let engine = AnalyzerEngine::new(TldRegistry::empty());
        let result = engine.analyze("-bad.example.com", &[]).await;
        assert!(matches!(result, Err(EngineError::InvalidDomain(_))));
    }

    #[tokio::test]
    async fn test_analyze_unknown_checks_only_yields_empty_report() {
        let engine = AnalyzerEngine::new(TldRegistry::empty());
        let report = engine
            .analyze("example.com", &names(&["notacheck"]))
            .await
            .unwrap();
        assert_eq!(report.summary.total, 0);
        assert!(report.checks.is_empty());
        assert_eq!(report.status, "completed");
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_analyze_full_run_google() {
        let engine = AnalyzerEngine::with_builtin_registry();
        let report = engine.analyze("google.com", &[]).await.unwrap();

        assert_eq!(report.domain, "google.com");
        assert_eq!(report.summary.total, report.checks.len());
        assert_eq!(
            report.summary.passed
                + report.summary.warnings
                + report.summary.errors
                + report.summary.info,
            report.summary.total
        );
        // Canonical key order in the serialized report
        let json = serde_json::to_string(&report).unwrap();
        let ns_pos = json.find("\"ns\"").unwrap();
        let www_pos = json.rfind("\"www\"").unwrap();
        assert!(ns_pos < www_pos);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_analyze_subset_contains_only_requested() {
        let engine = AnalyzerEngine::with_builtin_registry();
        let report = engine
            .analyze("example.com", &names(&["spf", "txt"]))
            .await
            .unwrap();
        assert_eq!(report.summary.total, 2);
        assert!(report.checks.get(CheckKind::Spf).is_some());
        assert!(report.checks.get(CheckKind::Txt).is_some());
        assert!(report.checks.get(CheckKind::Ns).is_none());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_analyze_idempotent_statuses() {
        let engine = AnalyzerEngine::with_builtin_registry();
        let first = engine.analyze("example.com", &names(&["soa", "caa"])).await.unwrap();
        let second = engine.analyze("example.com", &names(&["soa", "caa"])).await.unwrap();

        let keys = |report: &Report| -> Vec<(String, String)> {
            report
                .checks
                .iter()
                .map(|(kind, result)| (kind.name().to_string(), result.status().to_string()))
                .collect()
        };
        assert_eq!(keys(&first), keys(&second));
    }
}
