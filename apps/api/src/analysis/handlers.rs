use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::analysis::{AnalysisResult, Analyzer};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

/// Fields are optional so a missing one is a 400 with a message rather than
/// a JSON rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_id: Option<String>,
    pub job_description: Option<String>,
}

/// POST /api/resumes/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(request) = payload?;
    let resume_id = request
        .resume_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("resumeId is required".to_string()))?;
    let job_description = request
        .job_description
        .as_deref()
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("jobDescription is required".to_string()))?;

    // An id that cannot be a resume id cannot name one of the caller's resumes.
    let resume_id = Uuid::parse_str(resume_id)
        .map_err(|_| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let analyzer = Analyzer {
        resumes: &state.resumes,
        extractor: state.extractor.as_ref(),
        llm: &state.llm,
    };

    match analyzer.analyze(user_id, resume_id, job_description).await {
        Ok(result) => Ok(Json(result)),
        Err(e) if !state.config.expose_upstream_raw => Err(e.redact_raw()),
        Err(e) => Err(e),
    }
}
