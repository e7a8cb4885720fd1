//! Resume Store: durable PDF bytes plus the metadata record that points at them.
//!
//! Bytes are always written before the record is committed and removed before
//! the record is deleted, so a record never points at bytes that were never
//! written. A failed byte deletion leaves an orphan for a later sweep.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::resume::{NewResume, Resume, ResumeRow};
use crate::storage::{ObjectStore, ObjectStoreError, StorageKind, StoredRef};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resume {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence of resume metadata. Every lookup is scoped by owner.
#[async_trait]
pub trait ResumeRecords: Send + Sync {
    async fn insert(&self, resume: &Resume) -> Result<(), StoreError>;
    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Resume>, StoreError>;
    /// Newest first.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError>;
    /// Returns `false` if nothing matched.
    async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

/// PostgreSQL-backed `ResumeRecords`.
#[derive(Debug, Clone)]
pub struct PgResumeRecords {
    pool: PgPool,
}

impl PgResumeRecords {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn from_row(row: ResumeRow) -> Result<Resume, StoreError> {
    Resume::try_from(row).map_err(StoreError::Storage)
}

#[async_trait]
impl ResumeRecords for PgResumeRecords {
    async fn insert(&self, resume: &Resume) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, user_id, title, original_filename, storage_kind, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(resume.id)
        .bind(resume.owner_id)
        .bind(&resume.title)
        .bind(&resume.original_filename)
        .bind(resume.stored_reference.kind().as_str())
        .bind(resume.stored_reference.key())
        .bind(resume.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Resume>, StoreError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .map(from_row)
            .transpose()
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(from_row)
        .collect()
    }

    async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Resume storage facade: validates uploads, routes bytes to the right backend,
/// and keeps records and bytes in step.
#[derive(Clone)]
pub struct ResumeStore {
    records: Arc<dyn ResumeRecords>,
    filesystem: Arc<dyn ObjectStore>,
    blob: Option<Arc<dyn ObjectStore>>,
    write_to: StorageKind,
    max_bytes: usize,
}

impl ResumeStore {
    pub fn new(
        records: Arc<dyn ResumeRecords>,
        filesystem: Arc<dyn ObjectStore>,
        blob: Option<Arc<dyn ObjectStore>>,
        write_to: StorageKind,
        max_bytes: usize,
    ) -> Result<Self, StoreError> {
        if write_to == StorageKind::Blob && blob.is_none() {
            return Err(StoreError::Storage(
                "blob storage selected but no blob store is configured".to_string(),
            ));
        }
        Ok(Self {
            records,
            filesystem,
            blob,
            write_to,
            max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn backend(&self, kind: StorageKind) -> Result<&dyn ObjectStore, StoreError> {
        match kind {
            StorageKind::Filesystem => Ok(self.filesystem.as_ref()),
            StorageKind::Blob => self.blob.as_deref().ok_or_else(|| {
                StoreError::Storage("resume is in blob storage but none is configured".to_string())
            }),
        }
    }

    /// Rejects anything that is not a PDF within the size ceiling.
    pub fn validate(&self, upload: &NewResume) -> Result<(), StoreError> {
        let content_type = upload
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());
        if content_type.as_deref() != Some(PDF_CONTENT_TYPE) {
            return Err(StoreError::Invalid("Only PDF files are allowed".to_string()));
        }
        if upload.bytes.is_empty() {
            return Err(StoreError::Invalid("Uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(StoreError::Invalid(format!(
                "File too large. Maximum size is {} bytes",
                self.max_bytes
            )));
        }
        if !upload.bytes.starts_with(PDF_MAGIC) {
            return Err(StoreError::Invalid(
                "Uploaded file is not a valid PDF".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates and persists an upload: bytes first, then the record.
    pub async fn store(&self, owner_id: Uuid, upload: NewResume) -> Result<Resume, StoreError> {
        self.validate(&upload)?;

        let id = Uuid::new_v4();
        let stored_reference = StoredRef::new(self.write_to, format!("resumes/{owner_id}/{id}.pdf"));
        let backend = self.backend(self.write_to)?;
        backend
            .put(stored_reference.key(), upload.bytes, PDF_CONTENT_TYPE)
            .await
            .map_err(|e| StoreError::Storage(format!("failed to store resume bytes: {e}")))?;

        let title = upload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(upload.original_filename.as_str())
            .to_string();
        let resume = Resume {
            id,
            owner_id,
            title,
            original_filename: upload.original_filename,
            stored_reference,
            created_at: Utc::now(),
        };

        if let Err(e) = self.records.insert(&resume).await {
            if let Err(cleanup) = backend.delete(resume.stored_reference.key()).await {
                warn!(
                    "Failed to remove bytes for uncommitted resume {}: {cleanup}",
                    resume.id
                );
            }
            return Err(e);
        }

        info!("Stored resume {} for user {owner_id}", resume.id);
        Ok(resume)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Resume, StoreError> {
        self.records
            .find(owner_id, id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError> {
        self.records.list(owner_id).await
    }

    /// Reads the PDF bytes of an owned resume.
    pub async fn fetch(&self, owner_id: Uuid, id: Uuid) -> Result<(Resume, Bytes), StoreError> {
        let resume = self.get(owner_id, id).await?;
        let bytes = self
            .backend(resume.stored_reference.kind())?
            .get(resume.stored_reference.key())
            .await
            .map_err(|e| match e {
                // The record was removed between lookup and read.
                ObjectStoreError::NotFound(_) => StoreError::NotFound(id),
                other => StoreError::Storage(format!("failed to read resume bytes: {other}")),
            })?;
        Ok((resume, bytes))
    }

    /// Removes the bytes, then the record.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let resume = self.get(owner_id, id).await?;

        let removed = match self.backend(resume.stored_reference.kind()) {
            Ok(backend) => backend
                .delete(resume.stored_reference.key())
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = removed {
            warn!(
                "Failed to delete bytes for resume {id} at {:?}, leaving orphan: {e}",
                resume.stored_reference
            );
        }

        if !self.records.remove(owner_id, id).await? {
            return Err(StoreError::NotFound(id));
        }
        info!("Deleted resume {id} for user {owner_id}");
        Ok(())
    }
}
