//! Handlers for image generation job submission and status polling.
//!
//! Routes:
//! - `POST /api/generate`      — submit a generation job
//! - `GET  /api/job/{job_id}`  — poll a submitted job

use animefactory_core::pipeline;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

/// POST /api/generate
///
/// Builds the fixed three-stage pipeline around the caller's prompt and
/// submits it upstream. The response carries only the upstream job id;
/// clients poll for the result.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<GenerateRequest>,
) -> AppResult<impl IntoResponse> {
    pipeline::validate_prompt(&input.prompt).map_err(AppError::Core)?;

    let request = pipeline::build_job_request(&input.prompt);
    tracing::info!(
        uid = %user.uid,
        request_id = %request.request_id,
        prompt_chars = input.prompt.chars().count(),
        "Submitting generation job"
    );

    let job_id = state
        .tensorart
        .submit_job(&request)
        .await
        .map_err(AppError::generation_failed)?;

    Ok(Json(GenerateResponse { job_id }))
}

/// GET /api/job/{job_id}
///
/// Relays the upstream job representation. The job id is validated before
/// it is spliced into the upstream path.
pub async fn job_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    pipeline::validate_job_id(&job_id).map_err(AppError::Core)?;

    tracing::debug!(uid = %user.uid, %job_id, "Checking job status");
    let response = state
        .tensorart
        .job_status(&job_id)
        .await
        .map_err(AppError::status_check_failed)?;

    let job = response.get("job").cloned().unwrap_or(serde_json::Value::Null);
    Ok(Json(json!({
        "job": job,
        "message": "Job status retrieved",
    })))
}
