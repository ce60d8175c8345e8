//! Serialized report shape returned to clients

use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::reports::{Report, ReportStatus};
use crate::services::lifecycle::PROOF_FILES_KEY;

/// External-facing report representation.
///
/// Stored proof references inside the details map are rewritten to
/// resolvable URLs (and also exposed top-level for convenience); timestamps
/// are ISO-8601.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub id: i64,
    pub username: Option<String>,
    pub description: String,
    pub image_url: Option<String>,
    pub status: ReportStatus,
    pub lat: f64,
    pub lng: f64,
    pub pollution_confidence: f64,
    pub description_match_confidence: f64,
    pub details: Map<String, Value>,
    pub precautions: String,
    pub action_taken: String,
    pub proof_urls: Vec<String>,
    pub awarded_credits: i64,
    pub created_at: String,
    pub last_checked_at: String,
}

impl ReportView {
    pub fn from_report(report: &Report, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut details = report.details.clone();

        // Column values win; details entries are the legacy fallback
        let precautions = report
            .precautions
            .clone()
            .or_else(|| string_detail(&details, "precautions"))
            .unwrap_or_default();
        let action_taken = report
            .govt_action
            .clone()
            .or_else(|| string_detail(&details, "govt_action"))
            .or_else(|| string_detail(&details, "action_taken"))
            .unwrap_or_default();

        // Proofs live under the verified partition regardless of how far the
        // report has progressed, so "approved" always resolves them.
        let proof_urls: Vec<String> = match details.get(PROOF_FILES_KEY) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|reference| format!("{}/uploads/approved/{}", base, reference))
                .collect(),
            _ => Vec::new(),
        };
        details.insert(
            PROOF_FILES_KEY.to_string(),
            Value::Array(proof_urls.iter().cloned().map(Value::String).collect()),
        );

        let image_url = report
            .image_filename
            .as_ref()
            .map(|filename| format!("{}/uploads/{}/{}", base, report.status, filename));

        ReportView {
            id: report.id,
            username: report.user_name.clone(),
            description: report.description.clone(),
            image_url,
            status: report.status,
            lat: report.lat,
            lng: report.lng,
            pollution_confidence: report.pollution_confidence,
            description_match_confidence: report.description_match_confidence,
            details,
            precautions,
            action_taken,
            proof_urls,
            awarded_credits: report.awarded_credits,
            created_at: report.created_at.to_rfc3339(),
            last_checked_at: report.last_checked_at.to_rfc3339(),
        }
    }
}

fn string_detail(details: &Map<String, Value>, key: &str) -> Option<String> {
    details
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn base_report() -> Report {
        let now = Utc::now();
        Report {
            id: 7,
            user_id: None,
            user_name: Some("alice".to_string()),
            description: "smoke over field".to_string(),
            image_filename: Some("abc_smoke.jpg".to_string()),
            image_hash: "hash".to_string(),
            lat: 12.9,
            lng: 77.6,
            status: ReportStatus::Verified,
            pollution_confidence: 60.0,
            description_match_confidence: 0.7,
            details: Map::new(),
            precautions: None,
            govt_action: None,
            awarded_credits: 100,
            created_at: now,
            last_checked_at: now,
        }
    }

    #[test]
    fn image_url_uses_status_segment() {
        let view = ReportView::from_report(&base_report(), "http://localhost:5810/");
        assert_eq!(
            view.image_url.as_deref(),
            Some("http://localhost:5810/uploads/verified/abc_smoke.jpg")
        );
    }

    #[test]
    fn proof_references_become_urls() {
        let mut report = base_report();
        report.status = ReportStatus::Finalized;
        report.precautions = Some("wear a mask".to_string());
        report.govt_action = Some("cleanup crew sent".to_string());
        report.details.insert(
            PROOF_FILES_KEY.to_string(),
            json!(["proofs/proof_1_a.jpg", "proofs/proof_2_b.jpg"]),
        );

        let view = ReportView::from_report(&report, "http://localhost:5810");
        assert_eq!(view.proof_urls.len(), 2);
        assert_eq!(
            view.proof_urls[0],
            "http://localhost:5810/uploads/approved/proofs/proof_1_a.jpg"
        );
        // details entry rewritten too
        assert_eq!(
            view.details.get(PROOF_FILES_KEY).unwrap(),
            &json!(view.proof_urls)
        );
    }

    #[test]
    fn details_entries_back_fill_missing_columns() {
        let mut report = base_report();
        report
            .details
            .insert("precautions".to_string(), json!("stay indoors"));
        report
            .details
            .insert("action_taken".to_string(), json!("inspection done"));

        let view = ReportView::from_report(&report, "http://localhost:5810");
        assert_eq!(view.precautions, "stay indoors");
        assert_eq!(view.action_taken, "inspection done");
    }

    #[test]
    fn missing_image_yields_no_url() {
        let mut report = base_report();
        report.image_filename = None;

        let view = ReportView::from_report(&report, "http://localhost:5810");
        assert!(view.image_url.is_none());
    }
}
