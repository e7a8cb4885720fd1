//! Axum route handlers for the Job API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::repository::{delete_job, find_job, insert_job, list_jobs, update_job};
use crate::models::job::{Job, JobPatch, NewJob};
use crate::resumes::handlers::MessageResponse;
use crate::state::AppState;

fn job_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Job {id} not found"))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(list_jobs(&state.db, user_id).await?))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<NewJob>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let Json(request) = payload?;
    let job = request
        .into_job(user_id, Utc::now())
        .map_err(AppError::Validation)?;
    insert_job(&state.db, &job).await?;
    info!("Created job {} ({} at {}) for user {user_id}", job.id, job.title, job.company);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    find_job(&state.db, user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| job_not_found(id))
}

/// PATCH /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<JobPatch>, JsonRejection>,
) -> Result<Json<Job>, AppError> {
    let Json(patch) = payload?;
    let mut job = find_job(&state.db, user_id, id)
        .await?
        .ok_or_else(|| job_not_found(id))?;

    patch
        .apply(&mut job, Utc::now())
        .map_err(AppError::Validation)?;

    if !update_job(&state.db, &job).await? {
        return Err(job_not_found(id));
    }
    Ok(Json(job))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    if !delete_job(&state.db, user_id, id).await? {
        return Err(job_not_found(id));
    }
    Ok(Json(MessageResponse {
        message: "Job deleted".to_string(),
    }))
}
