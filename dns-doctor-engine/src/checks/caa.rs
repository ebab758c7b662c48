//! CAA check: certificate-authority authorization presence.

use hickory_resolver::proto::rr::RecordType;

use super::CheckContext;
use crate::types::{CaaRecord, CaaReport, CheckStatus};

pub(crate) async fn check(ctx: &CheckContext) -> CaaReport {
    match ctx
        .client
        .lookup_raw(ctx.domain.as_str(), RecordType::CAA)
        .await
    {
        Ok(records) if !records.is_empty() => {
            let caa_records: Vec<CaaRecord> = records
                .iter()
                .filter_map(|record| {
                    record.data().as_caa().map(|caa| CaaRecord {
                        record: format!(
                            "{} {} \"{}\"",
                            if caa.issuer_critical() { 128 } else { 0 },
                            caa.tag().as_str(),
                            String::from_utf8_lossy(caa.raw_value())
                        ),
                        ttl: record.ttl(),
                    })
                })
                .collect();
            CaaReport {
                status: CheckStatus::Pass,
                records: caa_records,
                issues: vec!["CAA records found and configured".to_string()],
            }
        }
        Ok(_) => absent(),
        Err(err) if err.is_absent() => absent(),
        Err(err) => CaaReport {
            status: CheckStatus::Error,
            records: Vec::new(),
            issues: vec![format!("CAA check failed: {err}")],
        },
    }
}

fn absent() -> CaaReport {
    CaaReport {
        status: CheckStatus::Warning,
        records: Vec::new(),
        issues: vec![
            "No CAA records found. Consider adding CAA records for enhanced SSL security."
                .to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_warning() {
        let report = absent();
        assert_eq!(report.status, CheckStatus::Warning);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_caa_check_real() {
        let ctx = CheckContext {
            domain: crate::domain::Domain::parse("google.com").unwrap(),
            client: std::sync::Arc::new(crate::resolver::DnsClient::new()),
            registry: std::sync::Arc::new(crate::tld::TldRegistry::empty()),
        };
        let report = check(&ctx).await;
        // google.com publishes CAA
        assert_eq!(report.status, CheckStatus::Pass);
        assert!(report.records.iter().any(|r| r.record.contains("issue")));
    }
}
