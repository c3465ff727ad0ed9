//! Reconciliation Report

use crate::divergence::Divergence;
use crate::error::VerifierResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scan counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub buckets: usize,
    pub suspended_buckets: usize,
    pub addresses: usize,
    pub gvgs: usize,
    pub lock_records: usize,
}

/// Result of one reconciliation pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// When the pass ran; not covered by the digest
    pub generated_at: DateTime<Utc>,
    pub stats: ScanStats,
    /// Hard divergences
    pub divergences: Vec<Divergence>,
    /// Divergences on allow-listed addresses
    pub known: Vec<Divergence>,
    /// Hex BLAKE3 digest over the canonical JSON of stats and findings
    pub digest: String,
}

/// Digest input, in canonical field order
#[derive(Serialize)]
struct DigestInput<'a> {
    stats: &'a ScanStats,
    divergences: &'a [Divergence],
    known: &'a [Divergence],
}

impl ReconciliationReport {
    /// Build a report and seal it with its digest
    pub fn new(
        generated_at: DateTime<Utc>,
        stats: ScanStats,
        divergences: Vec<Divergence>,
        known: Vec<Divergence>,
    ) -> VerifierResult<Self> {
        let mut report = Self {
            generated_at,
            stats,
            divergences,
            known,
            digest: String::new(),
        };
        report.digest = report.compute_digest()?;
        Ok(report)
    }

    /// Digest of the findings, independent of when the pass ran
    pub fn compute_digest(&self) -> VerifierResult<String> {
        let input = DigestInput {
            stats: &self.stats,
            divergences: &self.divergences,
            known: &self.known,
        };
        let bytes = serde_json::to_vec(&input)?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// Whether the stored digest matches the findings
    pub fn verify_digest(&self) -> VerifierResult<bool> {
        Ok(self.compute_digest()? == self.digest)
    }

    /// No hard divergence (known ones do not count)
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn has_divergence(&self) -> bool {
        !self.is_clean()
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        if self.is_clean() {
            format!(
                "Reconciliation PASSED: {} buckets, {} addresses, {} known divergences",
                self.stats.buckets,
                self.stats.addresses,
                self.known.len()
            )
        } else {
            format!(
                "Reconciliation FAILED: {} divergences ({} known) across {} buckets, {} addresses",
                self.divergences.len(),
                self.known.len(),
                self.stats.buckets,
                self.stats.addresses
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_core::GvgId;

    fn finding() -> Divergence {
        Divergence::GvgStoredSize {
            gvg_id: GvgId::new(1),
            recorded: 10,
            bound: 0,
        }
    }

    #[test]
    fn test_digest_ignores_time() {
        let a = ReconciliationReport::new(Utc::now(), ScanStats::default(), vec![finding()], vec![]).unwrap();
        let b = ReconciliationReport::new(
            Utc::now() + chrono::Duration::hours(1),
            ScanStats::default(),
            vec![finding()],
            vec![],
        )
        .unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
        assert!(a.verify_digest().unwrap());
    }

    #[test]
    fn test_digest_covers_findings() {
        let clean = ReconciliationReport::new(Utc::now(), ScanStats::default(), vec![], vec![]).unwrap();
        let dirty = ReconciliationReport::new(Utc::now(), ScanStats::default(), vec![finding()], vec![]).unwrap();
        assert_ne!(clean.digest, dirty.digest);

        let mut tampered = dirty.clone();
        tampered.divergences.clear();
        assert!(!tampered.verify_digest().unwrap());
    }

    #[test]
    fn test_known_findings_keep_report_clean() {
        let report = ReconciliationReport::new(Utc::now(), ScanStats::default(), vec![], vec![finding()]).unwrap();
        assert!(report.is_clean());
        assert!(report.summary().starts_with("Reconciliation PASSED"));
        assert!(report.summary().contains("1 known"));
    }

    #[test]
    fn test_failed_summary() {
        let report = ReconciliationReport::new(Utc::now(), ScanStats::default(), vec![finding()], vec![]).unwrap();
        assert!(report.has_divergence());
        assert!(report.summary().starts_with("Reconciliation FAILED: 1 divergences"));
    }
}
