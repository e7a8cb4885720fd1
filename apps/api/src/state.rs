use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::resumes::extract::TextExtractor;
use crate::resumes::store::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub resumes: ResumeStore,
    /// Pluggable PDF text extractor. Default: `PdfTextExtractor`.
    pub extractor: Arc<dyn TextExtractor>,
    pub llm: LlmClient,
    pub config: Config,
}
