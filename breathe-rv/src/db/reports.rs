//! Report record operations
//!
//! Central entity of the service: one row per distinct submitted image,
//! mutated in place on re-verification and on lifecycle transitions, never
//! deleted.

use breathe_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;

/// Report lifecycle status
///
/// `pending` is transient: a report is scored on the same request that
/// creates it, so persisted rows are normally verified or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
    Approved,
    Finalized,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Approved => "approved",
            ReportStatus::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "verified" => Some(ReportStatus::Verified),
            "rejected" => Some(ReportStatus::Rejected),
            "approved" => Some(ReportStatus::Approved),
            "finalized" => Some(ReportStatus::Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pollution report record
#[derive(Debug, Clone)]
pub struct Report {
    pub id: i64,
    /// Owner's registered email as resolved from the user directory
    pub user_id: Option<String>,
    /// Denormalized owner display name, kept consistent at write time
    pub user_name: Option<String>,
    pub description: String,
    /// Stored filename relative to the partition root
    pub image_filename: Option<String>,
    /// SHA-256 hex digest of the raw image bytes
    pub image_hash: String,
    pub lat: f64,
    pub lng: f64,
    pub status: ReportStatus,
    /// 0-100 scale
    pub pollution_confidence: f64,
    /// 0-1 scale
    pub description_match_confidence: f64,
    /// Diagnostic keys from the scorer plus the reserved `_decision` entry
    pub details: Map<String, Value>,
    pub precautions: Option<String>,
    pub govt_action: Option<String>,
    pub awarded_credits: i64,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
}

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    let status_str: String = row.get("status");
    let status = ReportStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Invalid status in database: {}", status_str)))?;

    let details_str: String = row.get("details");
    let details: Map<String, Value> = serde_json::from_str(&details_str).unwrap_or_default();

    let created_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| Error::Internal(format!("Invalid created_at in database: {}", e)))?
        .with_timezone(&Utc);

    let checked_str: String = row.get("last_checked_at");
    let last_checked_at = DateTime::parse_from_rfc3339(&checked_str)
        .map_err(|e| Error::Internal(format!("Invalid last_checked_at in database: {}", e)))?
        .with_timezone(&Utc);

    Ok(Report {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        description: row.get("description"),
        image_filename: row.get("image_filename"),
        image_hash: row.get("image_hash"),
        lat: row.get("lat"),
        lng: row.get("lng"),
        status,
        pollution_confidence: row.get("pollution_confidence"),
        description_match_confidence: row.get("description_match_confidence"),
        details,
        precautions: row.get("precautions"),
        govt_action: row.get("govt_action"),
        awarded_credits: row.get("awarded_credits"),
        created_at,
        last_checked_at,
    })
}

fn details_json(report: &Report) -> Result<String> {
    serde_json::to_string(&report.details)
        .map_err(|e| Error::Internal(format!("Failed to serialize details: {}", e)))
}

/// Insert a new report, returning the assigned row id.
///
/// A UNIQUE violation on image_hash means another owner's row for the same
/// content won the race; it surfaces as `DuplicateConflict` so the caller
/// observes the same outcome as the lookup path.
pub async fn insert_report(pool: &SqlitePool, report: &Report) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reports (
            user_id, user_name, description, image_filename, image_hash,
            lat, lng, status, pollution_confidence, description_match_confidence,
            details, precautions, govt_action, awarded_credits,
            created_at, last_checked_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&report.user_id)
    .bind(&report.user_name)
    .bind(&report.description)
    .bind(&report.image_filename)
    .bind(&report.image_hash)
    .bind(report.lat)
    .bind(report.lng)
    .bind(report.status.as_str())
    .bind(report.pollution_confidence)
    .bind(report.description_match_confidence)
    .bind(details_json(report)?)
    .bind(&report.precautions)
    .bind(&report.govt_action)
    .bind(report.awarded_credits)
    .bind(report.created_at.to_rfc3339())
    .bind(report.last_checked_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::DuplicateConflict("Duplicate image uploaded by another user".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Write back the full record. Used both by re-verification and by the
/// lifecycle state machine (the latter inside a transaction).
pub async fn update_report<'e, E>(executor: E, report: &Report) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE reports SET
            user_id = ?,
            user_name = ?,
            description = ?,
            image_filename = ?,
            image_hash = ?,
            lat = ?,
            lng = ?,
            status = ?,
            pollution_confidence = ?,
            description_match_confidence = ?,
            details = ?,
            precautions = ?,
            govt_action = ?,
            awarded_credits = ?,
            last_checked_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&report.user_id)
    .bind(&report.user_name)
    .bind(&report.description)
    .bind(&report.image_filename)
    .bind(&report.image_hash)
    .bind(report.lat)
    .bind(report.lng)
    .bind(report.status.as_str())
    .bind(report.pollution_confidence)
    .bind(report.description_match_confidence)
    .bind(details_json(report)?)
    .bind(&report.precautions)
    .bind(&report.govt_action)
    .bind(report.awarded_credits)
    .bind(report.last_checked_at.to_rfc3339())
    .bind(report.id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load report by content hash (duplicate detection)
pub async fn find_by_hash(pool: &SqlitePool, hash: &str) -> Result<Option<Report>> {
    let row = sqlx::query("SELECT * FROM reports WHERE image_hash = ? LIMIT 1")
        .bind(hash)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(report_from_row).transpose()
}

/// Load report by id
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Report>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(report_from_row).transpose()
}

/// List reports whose status is one of the given set, in insertion order
pub async fn list_by_statuses(
    pool: &SqlitePool,
    statuses: &[ReportStatus],
) -> Result<Vec<Report>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; statuses.len()].join(", ");
    let sql = format!(
        "SELECT * FROM reports WHERE status IN ({}) ORDER BY id",
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for status in statuses {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(report_from_row).collect()
}

/// Count all report rows (used by tests and diagnostics)
pub async fn count_reports(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
