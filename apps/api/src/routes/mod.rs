pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers::handle_analyze;
use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Headroom above the PDF ceiling for multipart framing and the title field.
/// Oversized files then fail the store's own size check with a clear message.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.resumes.max_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route(
            "/api/resumes",
            get(resumes::handle_list)
                .post(resumes::handle_upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/resumes/analyze", post(handle_analyze))
        .route(
            "/api/resumes/:id",
            get(resumes::handle_get).delete(resumes::handle_delete),
        )
        .route("/api/resumes/:id/file", get(resumes::handle_download))
        // Job API
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .with_state(state)
}
