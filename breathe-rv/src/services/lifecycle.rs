//! Two-step finalization state machine
//!
//! Validators add precautions, government actors add the action taken plus
//! optional proof images. Finalized is a derived state: it is reached only
//! once both annotations are present, never by asking for it directly.

use breathe_common::{Error, Result};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::reports::{Report, ReportStatus};
use crate::services::content_store::ContentStore;

/// Details key accumulating remediation proof references
pub const PROOF_FILES_KEY: &str = "proof_files";
/// Details key for the optional rejection reason
pub const REJECTION_REASON_KEY: &str = "rejection_reason";

/// One proof image from the government actor
#[derive(Debug)]
pub struct ProofUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One annotation request against a report
#[derive(Debug, Default)]
pub struct AnnotateRequest {
    /// Requested status; defaults to approved when omitted
    pub status: Option<String>,
    /// Stored verbatim when present; an empty string is a valid value,
    /// distinct from "not provided"
    pub precautions: Option<String>,
    pub action_taken: Option<String>,
    /// Free-text reason, only honored on the rejected branch
    pub reason: Option<String>,
    pub proof_files: Vec<ProofUpload>,
}

/// Lifecycle state machine over persisted reports
pub struct LifecycleStateMachine {
    db: SqlitePool,
    store: Arc<ContentStore>,
}

impl LifecycleStateMachine {
    pub fn new(db: SqlitePool, store: Arc<ContentStore>) -> Self {
        Self { db, store }
    }

    /// Apply one annotation to a report.
    ///
    /// The load-mutate-store cycle runs inside one transaction so
    /// near-simultaneous validator and government updates serialize instead
    /// of losing fields to each other.
    pub async fn annotate(&self, report_id: i64, request: AnnotateRequest) -> Result<Report> {
        let requested = parse_requested_status(request.status.as_deref())?;

        let mut tx = self.db.begin().await?;

        let mut report = crate::db::reports::find_by_id(&mut *tx, report_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No report with id {}", report_id)))?;

        report.status = requested;

        if requested == ReportStatus::Rejected {
            if let Some(reason) = request.reason.filter(|r| !r.is_empty()) {
                report
                    .details
                    .insert(REJECTION_REASON_KEY.to_string(), json!(reason));
            }
        } else {
            self.apply_annotations(&mut report, request)?;

            let has_precautions = report
                .precautions
                .as_deref()
                .is_some_and(|p| !p.is_empty());
            let has_action = report.govt_action.as_deref().is_some_and(|a| !a.is_empty());
            if has_precautions && has_action {
                report.status = ReportStatus::Finalized;
            }
        }

        crate::db::reports::update_report(&mut *tx, &report).await?;
        tx.commit().await?;

        tracing::info!(report_id = report_id, status = %report.status, "Report annotated");
        Ok(report)
    }

    fn apply_annotations(&self, report: &mut Report, request: AnnotateRequest) -> Result<()> {
        if let Some(precautions) = request.precautions {
            report.precautions = Some(precautions.clone());
            report
                .details
                .insert("precautions".to_string(), json!(precautions));
        }

        if let Some(action) = request.action_taken {
            report.govt_action = Some(action.clone());
            report
                .details
                .insert("govt_action".to_string(), json!(action));
        }

        if !request.proof_files.is_empty() {
            let mut saved = existing_proofs(report);

            for proof in &request.proof_files {
                if proof.filename.is_empty() || proof.bytes.is_empty() {
                    continue;
                }
                // A failed proof write is logged and skipped; the remaining
                // proofs and the annotation itself still go through.
                match self.store.store_proof(&proof.filename, &proof.bytes) {
                    Ok(reference) => saved.push(reference),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed saving proof image");
                    }
                }
            }

            report
                .details
                .insert(PROOF_FILES_KEY.to_string(), json!(saved));
        }

        Ok(())
    }
}

/// Proof references accumulate across calls; they are never replaced
fn existing_proofs(report: &Report) -> Vec<String> {
    match report.details.get(PROOF_FILES_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Only approved, rejected, and finalized may be requested. A finalized
/// request is treated as approved: the finalized state is derived from the
/// annotations, so it can never be reached while either is missing.
fn parse_requested_status(requested: Option<&str>) -> Result<ReportStatus> {
    match requested {
        None => Ok(ReportStatus::Approved),
        Some(s) => match ReportStatus::parse(s) {
            Some(ReportStatus::Rejected) => Ok(ReportStatus::Rejected),
            Some(ReportStatus::Approved) | Some(ReportStatus::Finalized) => {
                Ok(ReportStatus::Approved)
            }
            _ => Err(Error::Validation(format!("Invalid status: {}", s))),
        },
    }
}
