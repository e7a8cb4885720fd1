//! In-memory fakes shared by unit and router tests.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::Config;
use crate::llm_client::{CompletionProvider, FallbackPolicy, LlmClient, LlmError};
use crate::models::resume::{NewResume, Resume};
use crate::resumes::extract::{ExtractError, TextExtractor};
use crate::resumes::store::{ResumeRecords, ResumeStore, StoreError};
use crate::state::AppState;
use crate::storage::{ObjectStore, ObjectStoreError, StorageKind};

pub fn pdf_upload(bytes: &[u8]) -> NewResume {
    NewResume {
        title: None,
        original_filename: "resume.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: Bytes::copy_from_slice(bytes),
    }
}

/// Builds a one-page PDF that shows each line in Helvetica, with a correct
/// xref table so real parsers accept it.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n72 720 Td\n");
    for line in lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj\n0 -14 Td\n"));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_deletes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.objects.lock().unwrap().clear();
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), ObjectStoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("delete disabled".to_string()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryResumeRecords {
    rows: Mutex<Vec<Resume>>,
    fail_inserts: AtomicBool,
}

impl MemoryResumeRecords {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResumeRecords for MemoryResumeRecords {
    async fn insert(&self, resume: &Resume) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("insert disabled".to_string()));
        }
        self.rows.lock().unwrap().push(resume.clone());
        Ok(())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Resume>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.owner_id == owner_id)
            .cloned())
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError> {
        let mut rows: Vec<Resume> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.owner_id == owner_id));
        Ok(rows.len() < before)
    }
}

/// Returns fixed text, or fails every call.
pub struct StubExtractor {
    text: Option<String>,
}

impl StubExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _pdf: Bytes) -> Result<String, ExtractError> {
        self.text
            .clone()
            .ok_or_else(|| ExtractError::Unreadable("encrypted document".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub system: String,
    pub prompt: String,
}

/// Replays scripted replies in order and records every call.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            system: system.to_string(),
            prompt: prompt.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/jobtrail_test".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        client_url: None,
        upload_dir: PathBuf::from("./uploads-test"),
        storage_backend: StorageKind::Filesystem,
        s3: None,
        max_upload_bytes: 4096,
        llm_api_url: "http://localhost/v1/chat/completions".to_string(),
        llm_api_key: "test-key".to_string(),
        llm_primary_model: "primary".to_string(),
        llm_fallback_model: "fallback".to_string(),
        llm_timeout_secs: 5,
        expose_upstream_raw: true,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub records: Arc<MemoryResumeRecords>,
    pub disk: Arc<MemoryObjectStore>,
}

pub fn test_state(extractor: StubExtractor, provider: ScriptedProvider) -> TestApp {
    test_state_with_provider(extractor, Arc::new(provider))
}

/// Full `AppState` over in-memory fakes. The Postgres pool is lazy and never
/// connects unless a job route is exercised.
pub fn test_state_with_provider(
    extractor: StubExtractor,
    provider: Arc<ScriptedProvider>,
) -> TestApp {
    let config = test_config();
    let records = Arc::new(MemoryResumeRecords::default());
    let disk = Arc::new(MemoryObjectStore::default());
    let resumes = ResumeStore::new(
        records.clone(),
        disk.clone(),
        None,
        StorageKind::Filesystem,
        config.max_upload_bytes,
    )
    .unwrap();
    let db = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    let llm = LlmClient::new(
        provider,
        FallbackPolicy::primary_then_fallback(
            config.llm_primary_model.clone(),
            config.llm_fallback_model.clone(),
        ),
    );

    TestApp {
        state: AppState {
            db,
            resumes,
            extractor: Arc::new(extractor),
            llm,
            config,
        },
        records,
        disk,
    }
}
