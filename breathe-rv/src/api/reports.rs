//! Report API handlers
//!
//! Upload, the two-step validate flow, the portal listings, and the
//! leaderboard. Authentication happens upstream; the caller's identity
//! arrives in the X-User-Identity header.

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::reports::ReportStatus;
use crate::error::{ApiError, ApiResult};
use crate::models::ReportView;
use crate::services::leaderboard::{self, LeaderboardEntry};
use crate::services::lifecycle::{AnnotateRequest, ProofUpload};
use crate::services::verification::Submission;
use crate::AppState;

const IDENTITY_HEADER: &str = "x-user-identity";
const LEADERBOARD_LIMIT: usize = 10;

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/upload", post(upload_report))
        .route("/api/reports", get(list_pending))
        .route("/api/reports/:id/validate", put(validate_report))
        .route("/api/reports/approved", get(list_finalized))
        .route("/api/reports/leaderboard", get(leaderboard))
}

fn identity_from_headers(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing X-User-Identity header".to_string()))
}

/// POST /api/reports/upload
///
/// Multipart form: `image` (file), `description`, `lat`, `lng`.
/// 201 on a new report, 200 on a same-owner re-check.
pub async fn upload_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ReportView>)> {
    let identity = identity_from_headers(&headers)?;

    let mut image: Option<(String, Vec<u8>)> = None;
    let mut description = String::new();
    let mut lat: Option<f64> = None;
    let mut lng: Option<f64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable image field: {}", e)))?;
                image = Some((filename, bytes.to_vec()));
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable field: {}", e)))?
                    .trim()
                    .to_string();
            }
            "lat" => lat = Some(parse_coordinate(&name, field.text().await)?),
            "lng" => lng = Some(parse_coordinate(&name, field.text().await)?),
            _ => {}
        }
    }

    let (filename, bytes) =
        image.ok_or_else(|| ApiError::BadRequest("No image file uploaded".to_string()))?;
    let (lat, lng) = lat.zip(lng).ok_or_else(|| {
        ApiError::BadRequest("Latitude and longitude are required".to_string())
    })?;

    let outcome = state
        .pipeline
        .submit(Submission {
            image: &bytes,
            filename: &filename,
            description: &description,
            lat,
            lng,
            identity: &identity,
        })
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let view = ReportView::from_report(&outcome.report, &state.public_base_url);
    Ok((status, Json(view)))
}

fn parse_coordinate(
    name: &str,
    text: Result<String, axum::extract::multipart::MultipartError>,
) -> ApiResult<f64> {
    let text = text.map_err(|e| ApiError::BadRequest(format!("Unreadable field: {}", e)))?;
    text.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} value", name)))
}

/// GET /api/reports
///
/// Validator portal: verified/approved reports still missing either the
/// precautions or the government action.
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<ReportView>>> {
    let reports = crate::db::reports::list_by_statuses(
        &state.db,
        &[ReportStatus::Approved, ReportStatus::Verified],
    )
    .await?;

    let views = reports
        .iter()
        .filter(|r| {
            let complete = r.precautions.as_deref().is_some_and(|p| !p.is_empty())
                && r.govt_action.as_deref().is_some_and(|a| !a.is_empty());
            !complete
        })
        .map(|r| ReportView::from_report(r, &state.public_base_url))
        .collect();

    Ok(Json(views))
}

/// JSON body accepted by the validate endpoint
#[derive(Debug, Default, Deserialize)]
struct ValidateBody {
    status: Option<String>,
    precautions: Option<String>,
    action_taken: Option<String>,
    /// Synonym for action_taken, kept for older clients
    govt_action: Option<String>,
    reason: Option<String>,
}

impl ValidateBody {
    fn into_annotate_request(self, proof_files: Vec<ProofUpload>) -> AnnotateRequest {
        AnnotateRequest {
            status: self.status,
            precautions: self.precautions,
            action_taken: self.action_taken.or(self.govt_action),
            reason: self.reason,
            proof_files,
        }
    }
}

/// PUT /api/reports/:id/validate
///
/// Accepts JSON (validator step: precautions) or multipart/form-data
/// (government step: action_taken plus proof_images files).
pub async fn validate_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    request: Request,
) -> ApiResult<Json<serde_json::Value>> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let annotate = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?;
        annotate_from_multipart(multipart).await?
    } else {
        annotate_from_json(request).await?
    };

    let report = state.lifecycle.annotate(report_id, annotate).await?;
    let view = ReportView::from_report(&report, &state.public_base_url);

    Ok(Json(json!({
        "message": format!("Report {}", report.status),
        "report": view,
    })))
}

async fn annotate_from_json(request: Request) -> ApiResult<AnnotateRequest> {
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Unreadable body: {}", e)))?;

    let body: ValidateBody = if bytes.is_empty() {
        ValidateBody::default()
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {}", e)))?
    };

    Ok(body.into_annotate_request(Vec::new()))
}

async fn annotate_from_multipart(mut multipart: Multipart) -> ApiResult<AnnotateRequest> {
    let mut body = ValidateBody::default();
    let mut proof_files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "proof_images" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Unreadable proof image: {}", e))
                })?;
                proof_files.push(ProofUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable field: {}", e)))?;
                match other {
                    "status" => body.status = Some(value),
                    "precautions" => body.precautions = Some(value),
                    "action_taken" => body.action_taken = Some(value),
                    "govt_action" => body.govt_action = Some(value),
                    "reason" => body.reason = Some(value),
                    _ => {}
                }
            }
        }
    }

    Ok(body.into_annotate_request(proof_files))
}

/// GET /api/reports/approved
///
/// Government portal: finalized reports only.
pub async fn list_finalized(State(state): State<AppState>) -> ApiResult<Json<Vec<ReportView>>> {
    let reports =
        crate::db::reports::list_by_statuses(&state.db, &[ReportStatus::Finalized]).await?;

    let views = reports
        .iter()
        .map(|r| ReportView::from_report(r, &state.public_base_url))
        .collect();

    Ok(Json(views))
}

/// GET /api/reports/leaderboard
pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let top = leaderboard::top_credits(&state.db, LEADERBOARD_LIMIT).await?;
    Ok(Json(top))
}
