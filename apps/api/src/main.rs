mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod resumes;
mod routes;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{FallbackPolicy, LlmClient, OpenAiProvider};
use crate::resumes::extract::PdfTextExtractor;
use crate::resumes::store::{PgResumeRecords, ResumeStore};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{LocalDiskStore, ObjectStore, S3BlobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobtrail API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize resume storage
    let filesystem = LocalDiskStore::open(&config.upload_dir)
        .await
        .context("Failed to prepare upload directory")?;
    let blob: Option<Arc<dyn ObjectStore>> = match &config.s3 {
        Some(s3_config) => {
            let s3 = S3BlobStore::connect(s3_config).await;
            s3.ensure_bucket().await?;
            info!("S3 blob store initialized (bucket: {})", s3_config.bucket);
            Some(Arc::new(s3) as Arc<dyn ObjectStore>)
        }
        None => None,
    };
    let resumes = ResumeStore::new(
        Arc::new(PgResumeRecords::new(db.clone())),
        Arc::new(filesystem),
        blob,
        config.storage_backend,
        config.max_upload_bytes,
    )?;
    info!(
        "Resume store initialized (writing to {}, max {} bytes)",
        config.storage_backend.as_str(),
        config.max_upload_bytes
    );

    // Initialize LLM client
    let provider = OpenAiProvider::new(
        config.llm_api_url.clone(),
        config.llm_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    let llm = LlmClient::new(
        Arc::new(provider),
        FallbackPolicy::primary_then_fallback(
            config.llm_primary_model.clone(),
            config.llm_fallback_model.clone(),
        ),
    );
    info!("LLM client initialized (policy: {:?})", llm.policy().attempts());

    // Build app state
    let state = AppState {
        db,
        resumes,
        extractor: Arc::new(PdfTextExtractor),
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Restricts CORS to `CLIENT_URL` when set; permissive otherwise (local dev).
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let Some(client_url) = &config.client_url else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(client_url)
        .with_context(|| format!("CLIENT_URL '{client_url}' is not a valid origin"))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(auth::USER_ID_HEADER),
        ])
        .allow_credentials(true))
}
