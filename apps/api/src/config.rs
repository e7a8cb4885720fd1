use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::llm_client;
use crate::storage::StorageKind;

/// Default resume size ceiling: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// S3-compatible blob storage settings. Only present when `STORAGE_BACKEND=s3`.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub client_url: Option<String>,
    pub upload_dir: PathBuf,
    pub storage_backend: StorageKind,
    pub s3: Option<S3Config>,
    pub max_upload_bytes: usize,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_primary_model: String,
    pub llm_fallback_model: String,
    pub llm_timeout_secs: u64,
    /// Include the raw model reply in parse-failure responses.
    pub expose_upstream_raw: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage_backend = match optional_env("STORAGE_BACKEND").as_deref() {
            None | Some("filesystem") | Some("fs") => StorageKind::Filesystem,
            Some("s3") | Some("blob") => StorageKind::Blob,
            Some(other) => bail!("STORAGE_BACKEND must be 'filesystem' or 's3', got '{other}'"),
        };

        // S3 settings are picked up whenever a bucket is named, so records written
        // to blob storage stay readable after switching the write target back.
        let s3 = match optional_env("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: optional_env("S3_ENDPOINT"),
                region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None if storage_backend == StorageKind::Blob => {
                bail!("S3_BUCKET is required when STORAGE_BACKEND=s3")
            }
            None => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 5050)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            client_url: optional_env("CLIENT_URL"),
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            storage_backend,
            s3,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| llm_client::DEFAULT_API_URL.to_string()),
            llm_api_key: require_env("OPENAI_API_KEY")?,
            llm_primary_model: optional_env("LLM_PRIMARY_MODEL")
                .unwrap_or_else(|| llm_client::PRIMARY_MODEL.to_string()),
            llm_fallback_model: optional_env("LLM_FALLBACK_MODEL")
                .unwrap_or_else(|| llm_client::FALLBACK_MODEL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            expose_upstream_raw: parse_bool_env("EXPOSE_UPSTREAM_RAW", true)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match optional_env(key) {
        Some(raw) => parse_bool(&raw).with_context(|| format!("{key} must be true or false")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
