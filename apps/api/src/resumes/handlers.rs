//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::resume::{NewResume, Resume};
use crate::resumes::store::PDF_CONTENT_TYPE;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/resumes
///
/// Multipart fields: `resume` (the PDF, required) and `title` (optional).
pub async fn handle_upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or("") {
            "resume" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|_| {
                    AppError::Validation(format!(
                        "Invalid or oversized file. Maximum size is {} bytes",
                        state.resumes.max_bytes()
                    ))
                })?;
                file = Some((file_name, content_type, data));
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid title: {e}")))?,
                );
            }
            name => {
                // Drain unknown fields so the stream can advance.
                let name = name.to_string();
                field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Invalid multipart field '{name}': {e}"))
                })?;
            }
        }
    }

    let (original_filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let resume = state
        .resumes
        .store(
            user_id,
            NewResume {
                title,
                original_filename,
                content_type,
                bytes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Resume>>, AppError> {
    Ok(Json(state.resumes.list(user_id).await?))
}

/// GET /api/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Resume>, AppError> {
    Ok(Json(state.resumes.get(user_id, id).await?))
}

/// GET /api/resumes/:id/file
///
/// Streams the stored PDF back with its original filename.
pub async fn handle_download(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (resume, bytes) = state.resumes.fetch(user_id, id).await?;
    let disposition = format!(
        "inline; filename=\"{}\"",
        header_safe_filename(&resume.original_filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/resumes/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.resumes.delete(user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "Resume deleted successfully".to_string(),
    }))
}

/// Keeps printable ASCII minus quotes and backslashes.
fn header_safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    if cleaned.trim().is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_filename() {
        assert_eq!(header_safe_filename("cv.pdf"), "cv.pdf");
        assert_eq!(header_safe_filename("my \"best\" cv.pdf"), "my _best_ cv.pdf");
        assert_eq!(header_safe_filename("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(header_safe_filename(""), "resume.pdf");
    }
}
