//! Report verification pipeline
//!
//! Orchestrates identity resolution, content hashing, duplicate policy,
//! scorer invocation, the threshold decision, and the paired content-store
//! and repository writes.

use breathe_common::{Error, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::reports::{Report, ReportStatus};
use crate::services::content_store::{ContentStore, Partition};
use crate::services::scorer::Scorer;
use crate::services::user_directory::UserDirectory;

/// Minimum pollution confidence (0-100 scale, inclusive)
pub const POLLUTION_THRESHOLD_PERCENT: f64 = 45.0;
/// Minimum description-match confidence (0-1 scale, inclusive)
pub const DESCRIPTION_THRESHOLD_FRACTION: f64 = 0.60;

/// One upload request, as handed over by the request layer
#[derive(Debug)]
pub struct Submission<'a> {
    pub image: &'a [u8],
    pub filename: &'a str,
    pub description: &'a str,
    pub lat: f64,
    pub lng: f64,
    /// Pre-authenticated identity (email, or legacy display name)
    pub identity: &'a str,
}

/// Pipeline result: the persisted report plus whether a new row was created
/// (false on a same-owner re-check).
#[derive(Debug)]
pub struct SubmitOutcome {
    pub report: Report,
    pub created: bool,
}

/// Normalized scorer verdict for one evaluation
struct Evaluation {
    pollution_pct: f64,
    description_frac: f64,
    verified: bool,
    awarded_credits: i64,
    details: Map<String, Value>,
}

/// Report verification pipeline with explicitly injected collaborators
pub struct VerificationPipeline {
    db: SqlitePool,
    store: Arc<ContentStore>,
    scorer: Arc<dyn Scorer>,
    users: Arc<dyn UserDirectory>,
}

impl VerificationPipeline {
    pub fn new(
        db: SqlitePool,
        store: Arc<ContentStore>,
        scorer: Arc<dyn Scorer>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            db,
            store,
            scorer,
            users,
        }
    }

    /// Verify and persist one upload.
    ///
    /// Same-owner re-uploads of identical bytes re-score the existing report
    /// in place; the same bytes from a different owner are a conflict and are
    /// never re-scored.
    pub async fn submit(&self, submission: Submission<'_>) -> Result<SubmitOutcome> {
        let user = self.resolve_identity(submission.identity).await?;

        if submission.image.is_empty() {
            return Err(Error::Validation("Uploaded file is empty".to_string()));
        }
        if submission.filename.trim().is_empty() {
            return Err(Error::Validation("Empty filename".to_string()));
        }

        let hash = content_hash(submission.image);
        tracing::debug!(hash = %hash, user = %user.name, "Processing upload");

        match crate::db::reports::find_by_hash(&self.db, &hash).await? {
            Some(existing) if existing.user_name.as_deref() == Some(user.name.as_str()) => {
                let report = self.reverify(existing, &submission).await?;
                Ok(SubmitOutcome {
                    report,
                    created: false,
                })
            }
            Some(_) => {
                tracing::info!(hash = %hash, "Cross-owner duplicate rejected");
                Err(Error::DuplicateConflict(
                    "Duplicate image uploaded by another user".to_string(),
                ))
            }
            None => {
                let report = self.create(&submission, &user, hash).await?;
                Ok(SubmitOutcome {
                    report,
                    created: true,
                })
            }
        }
    }

    /// Email lookup first, then the explicit display-name fallback
    async fn resolve_identity(
        &self,
        identity: &str,
    ) -> Result<crate::services::user_directory::UserRecord> {
        if let Some(user) = self.users.find_by_email(identity).await? {
            return Ok(user);
        }
        if let Some(user) = self.users.find_by_name(identity).await? {
            return Ok(user);
        }
        Err(Error::UserNotFound(
            "Identity is not registered".to_string(),
        ))
    }

    async fn evaluate(&self, submission: &Submission<'_>) -> Result<Evaluation> {
        let outcome = self
            .scorer
            .score(submission.image, submission.filename, submission.description)
            .await?;

        let pollution_pct = normalize_pollution_confidence(outcome.pollution_confidence);
        let description_frac =
            normalize_description_confidence(outcome.description_match_confidence);
        let verified = is_verified(pollution_pct, description_frac);
        let awarded_credits = if verified { outcome.awarded_credits } else { 0 };

        // The audit entry is overwritten on every evaluation, never appended
        let mut details = outcome.details;
        details.insert(
            "_decision".to_string(),
            json!({
                "pollution_conf_pct": pollution_pct,
                "desc_conf_frac": description_frac,
                "pollution_threshold": POLLUTION_THRESHOLD_PERCENT,
                "description_threshold": DESCRIPTION_THRESHOLD_FRACTION,
                "verified": verified,
            }),
        );

        tracing::info!(
            pollution_pct = pollution_pct,
            description_frac = description_frac,
            verified = verified,
            "Scored upload"
        );

        Ok(Evaluation {
            pollution_pct,
            description_frac,
            verified,
            awarded_credits,
            details,
        })
    }

    async fn create(
        &self,
        submission: &Submission<'_>,
        user: &crate::services::user_directory::UserRecord,
        hash: String,
    ) -> Result<Report> {
        let evaluation = self.evaluate(submission).await?;
        let stored_name = self.store_image(submission, evaluation.verified)?;
        let now = Utc::now();

        let report = Report {
            id: 0,
            user_id: Some(user.email.clone()),
            user_name: Some(user.name.clone()),
            description: submission.description.to_string(),
            image_filename: Some(stored_name.clone()),
            image_hash: hash,
            lat: submission.lat,
            lng: submission.lng,
            status: verdict_status(evaluation.verified),
            pollution_confidence: evaluation.pollution_pct,
            description_match_confidence: evaluation.description_frac,
            details: evaluation.details,
            precautions: None,
            govt_action: None,
            awarded_credits: evaluation.awarded_credits,
            created_at: now,
            last_checked_at: now,
        };

        let id = match crate::db::reports::insert_report(&self.db, &report).await {
            Ok(id) => id,
            Err(e @ Error::DuplicateConflict(_)) => {
                // Lost the insert race to another owner; the stored file has
                // no owning row now.
                tracing::warn!(stored = %stored_name, "Orphaned stored file after duplicate insert");
                return Err(e);
            }
            Err(Error::Database(e)) => {
                tracing::error!(error = %e, stored = %stored_name, "Report insert failed, stored file orphaned");
                return Err(Error::Persistence("Failed to persist report".to_string()));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(report_id = id, status = %report.status, "Report created");
        Ok(Report { id, ..report })
    }

    /// Re-run scoring against an existing same-owner report and update it in
    /// place. The stored file, confidences, status, credits, and audit entry
    /// are all refreshed; the row id and creation time are not.
    async fn reverify(&self, existing: Report, submission: &Submission<'_>) -> Result<Report> {
        let evaluation = self.evaluate(submission).await?;
        let stored_name = self.store_image(submission, evaluation.verified)?;

        let mut report = existing;
        report.last_checked_at = Utc::now();
        if !submission.description.trim().is_empty() {
            report.description = submission.description.to_string();
        }
        report.pollution_confidence = evaluation.pollution_pct;
        report.description_match_confidence = evaluation.description_frac;
        report.details = evaluation.details;
        report.status = verdict_status(evaluation.verified);
        report.awarded_credits = evaluation.awarded_credits;
        report.image_filename = Some(stored_name.clone());

        crate::db::reports::update_report(&self.db, &report)
            .await
            .map_err(|e| match e {
                Error::Database(db_err) => {
                    tracing::error!(error = %db_err, stored = %stored_name, "Report update failed, stored file orphaned");
                    Error::Persistence("Failed to persist report".to_string())
                }
                other => other,
            })?;

        tracing::info!(report_id = report.id, status = %report.status, "Report re-verified");
        Ok(report)
    }

    fn store_image(&self, submission: &Submission<'_>, verified: bool) -> Result<String> {
        let partition = if verified {
            Partition::Verified
        } else {
            Partition::Rejected
        };
        self.store
            .store(partition, submission.filename, submission.image)
    }
}

fn verdict_status(verified: bool) -> ReportStatus {
    if verified {
        ReportStatus::Verified
    } else {
        ReportStatus::Rejected
    }
}

/// SHA-256 hex digest of the raw image bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Both thresholds are inclusive
pub fn is_verified(pollution_pct: f64, description_frac: f64) -> bool {
    pollution_pct >= POLLUTION_THRESHOLD_PERCENT
        && description_frac >= DESCRIPTION_THRESHOLD_FRACTION
}

/// Scorers emit pollution confidence on either a 0-1 or a 0-100 scale.
/// Raw values at or below 1.5 are treated as fractions and scaled up.
pub fn normalize_pollution_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    if raw <= 1.5 {
        raw * 100.0
    } else {
        raw
    }
}

/// Inverse convention tolerance for the description match: raw values above
/// 1.5 are treated as percentages and scaled down to a fraction.
pub fn normalize_description_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    if raw > 1.5 {
        raw / 100.0
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pollution_fraction_is_scaled_up() {
        assert_eq!(normalize_pollution_confidence(0.8), 80.0);
        assert_eq!(normalize_pollution_confidence(1.5), 150.0);
        assert_eq!(normalize_pollution_confidence(80.0), 80.0);
        assert_eq!(normalize_pollution_confidence(0.0), 0.0);
    }

    #[test]
    fn description_percentage_is_scaled_down() {
        assert_eq!(normalize_description_confidence(75.0), 0.75);
        assert_eq!(normalize_description_confidence(0.75), 0.75);
        assert_eq!(normalize_description_confidence(1.5), 1.5);
    }

    #[test]
    fn non_finite_confidences_become_zero() {
        assert_eq!(normalize_pollution_confidence(f64::NAN), 0.0);
        assert_eq!(normalize_description_confidence(f64::INFINITY), 0.0);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert!(is_verified(45.0, 0.60));
        assert!(is_verified(60.0, 0.7));
        assert!(!is_verified(44.999, 0.99));
        assert!(!is_verified(99.0, 0.599));
    }

    #[test]
    fn hash_is_sha256_hex() {
        let hash = content_hash(b"test content");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            format!("{:x}", Sha256::digest(b"test content"))
        );
    }
}
