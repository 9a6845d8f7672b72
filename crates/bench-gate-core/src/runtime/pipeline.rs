// crates/bench-gate-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Bench Gate Validation Pipeline
// Description: Full submission evaluation and atomic admission.
// Purpose: Combine validator, recomputer, detectors, and history into a gate.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde
// ============================================================================

//! ## Overview
//! The submission gate runs the full pipeline over one bundle: structural
//! validation, metric recomputation, anomaly detection, and anti-gaming
//! checks. The three severities stay separate in the report. Hard errors and
//! anti-gaming issues block admission; discrepancies and anomaly flags are
//! reported for policy and human review. Admission itself delegates the
//! replay and run-id uniqueness decision to the store's atomic check-and-
//! insert, so concurrent duplicates cannot both land.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::HistoryRecord;
use crate::core::Submission;
use crate::core::Timestamp;
use crate::interfaces::AdmitOutcome;
use crate::interfaces::HistoryStoreError;
use crate::interfaces::SubmissionHistoryStore;
use crate::runtime::anomaly::AnomalyFlag;
use crate::runtime::anomaly::detect_anomalies;
use crate::runtime::antigaming::AntiGamingIssue;
use crate::runtime::antigaming::AntiGamingPolicy;
use crate::runtime::antigaming::multi_run_requirement;
use crate::runtime::antigaming::validate_anti_gaming;
use crate::runtime::recompute::MetricDiscrepancy;
use crate::runtime::recompute::recompute_metrics;
use crate::runtime::validator::StructuralError;
use crate::runtime::validator::StructuralValidator;

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// Full evaluation result for one submission.
///
/// # Invariants
/// - The four lists are ordered and independent; severities are never
///   conflated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Hard structural errors; any entry blocks acceptance.
    pub errors: Vec<StructuralError>,
    /// Metric recomputation divergences; acceptance policy decides.
    pub discrepancies: Vec<MetricDiscrepancy>,
    /// Statistical anomaly flags; route to human review, never auto-reject.
    pub anomalies: Vec<AnomalyFlag>,
    /// Anti-gaming violations and advisories; any entry blocks acceptance.
    pub gaming_issues: Vec<AntiGamingIssue>,
}

impl ValidationReport {
    /// Returns `true` when no list blocks acceptance.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.errors.is_empty() && self.gaming_issues.is_empty()
    }

    /// Returns `true` when every list is empty.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_acceptable() && self.discrepancies.is_empty() && self.anomalies.is_empty()
    }

    /// Renders the report as four ordered string lists for the wire.
    #[must_use]
    pub fn to_wire(&self) -> WireReport {
        WireReport {
            errors: self.errors.iter().map(ToString::to_string).collect(),
            discrepancies: self.discrepancies.iter().map(ToString::to_string).collect(),
            anomalies: self.anomalies.iter().map(ToString::to_string).collect(),
            gaming_issues: self.gaming_issues.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Wire form of a report: four ordered string lists.
///
/// Empty `errors` means structurally valid; empty everything means clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WireReport {
    /// Hard structural error strings.
    pub errors: Vec<String>,
    /// Metric discrepancy strings.
    pub discrepancies: Vec<String>,
    /// Anomaly flag strings.
    pub anomalies: Vec<String>,
    /// Anti-gaming issue strings.
    pub gaming_issues: Vec<String>,
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The submission passed and was recorded in history.
    Accepted {
        /// The full evaluation report.
        report: ValidationReport,
    },
    /// The submission was rejected; history is unchanged.
    Rejected {
        /// The full evaluation report, including the blocking entries.
        report: ValidationReport,
    },
}

impl GateDecision {
    /// Returns the evaluation report regardless of outcome.
    #[must_use]
    pub const fn report(&self) -> &ValidationReport {
        match self {
            Self::Accepted {
                report,
            }
            | Self::Rejected {
                report,
            } => report,
        }
    }

    /// Returns `true` for an accepted submission.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

// ============================================================================
// SECTION: Submission Gate
// ============================================================================

/// Full validation pipeline over an explicit history store.
///
/// # Invariants
/// - Evaluation is pure given the store snapshot; `now` is host-supplied.
#[derive(Debug)]
pub struct SubmissionGate<S> {
    /// Structural validator with canonical context.
    validator: StructuralValidator,
    /// Throttling and ranking policy.
    policy: AntiGamingPolicy,
    /// Accepted-submission history and leaderboard state.
    store: S,
}

impl<S> SubmissionGate<S>
where
    S: SubmissionHistoryStore,
{
    /// Creates a gate from explicit parts.
    #[must_use]
    pub const fn new(validator: StructuralValidator, policy: AntiGamingPolicy, store: S) -> Self {
        Self {
            validator,
            policy,
            store,
        }
    }

    /// Returns the underlying history store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs the full pipeline without touching history.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError`] when the history store cannot be read.
    pub fn evaluate(
        &self,
        submission: &Submission,
        now: Timestamp,
    ) -> Result<ValidationReport, HistoryStoreError> {
        let errors = self.validator.validate(submission);
        let discrepancies = recompute_metrics(submission, self.validator.table());
        let anomalies = detect_anomalies(submission);

        let history = self.store.snapshot()?;
        let mut gaming_issues = validate_anti_gaming(
            submission,
            &history,
            &self.policy,
            self.validator.table().len(),
            now,
        );
        let leaderboard = self.store.leaderboard()?;
        if let Some(issue) = multi_run_requirement(submission, &leaderboard, &self.policy) {
            gaming_issues.push(issue);
        }

        Ok(ValidationReport {
            errors,
            discrepancies,
            anomalies,
            gaming_issues,
        })
    }

    /// Evaluates a submission and, when acceptable, records it atomically.
    ///
    /// The store decides duplicates; a concurrent replay that slips past the
    /// evaluation snapshot is still rejected by the atomic check-and-insert.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError`] when the history store fails.
    pub fn admit(
        &self,
        submission: &Submission,
        now: Timestamp,
    ) -> Result<GateDecision, HistoryStoreError> {
        let mut report = self.evaluate(submission, now)?;
        if !report.is_acceptable() {
            return Ok(GateDecision::Rejected {
                report,
            });
        }

        let record = HistoryRecord {
            contact_email: submission.metadata.contact_email.clone(),
            submitted_at: now,
            manifest_hash: submission.integrity.manifest_hash.clone(),
            run_id: submission.integrity.run_id.clone(),
            organization: submission.metadata.team.clone(),
        };
        match self.store.admit(&record)? {
            AdmitOutcome::Admitted => Ok(GateDecision::Accepted {
                report,
            }),
            AdmitOutcome::DuplicateManifest => {
                report.gaming_issues.push(AntiGamingIssue::ReplayedManifest {
                    prior_submitted_at: self.prior_submission_time(&record)?,
                });
                Ok(GateDecision::Rejected {
                    report,
                })
            }
            AdmitOutcome::DuplicateRunId => {
                let organization = self.prior_organization(&record)?;
                report.gaming_issues.push(AntiGamingIssue::ReusedRunId {
                    run_id: record.run_id,
                    organization,
                });
                Ok(GateDecision::Rejected {
                    report,
                })
            }
        }
    }

    /// Looks up the acceptance time of the prior submission with a matching
    /// manifest hash.
    fn prior_submission_time(&self, record: &HistoryRecord) -> Result<Timestamp, HistoryStoreError> {
        Ok(self
            .store
            .snapshot()?
            .iter()
            .find(|prior| prior.manifest_hash == record.manifest_hash)
            .map(|prior| prior.submitted_at)
            .unwrap_or(record.submitted_at))
    }

    /// Looks up the organization that first submitted a matching run id.
    fn prior_organization(&self, record: &HistoryRecord) -> Result<String, HistoryStoreError> {
        Ok(self
            .store
            .snapshot()?
            .iter()
            .find(|prior| prior.run_id == record.run_id)
            .map(|prior| prior.organization.clone())
            .unwrap_or_default())
    }
}
