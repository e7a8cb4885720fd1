use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::storage::{StorageKind, StoredRef};

/// Row shape of the `resumes` table.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub storage_kind: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// A stored PDF resume plus its metadata, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub stored_reference: StoredRef,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResumeRow> for Resume {
    type Error = String;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let kind = StorageKind::parse(&row.storage_kind).ok_or_else(|| {
            format!(
                "resume {} has unknown storage kind '{}'",
                row.id, row.storage_kind
            )
        })?;
        Ok(Resume {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            original_filename: row.original_filename,
            stored_reference: StoredRef::new(kind, row.storage_key),
            created_at: row.created_at,
        })
    }
}

/// An upload as received from the client, before validation.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub title: Option<String>,
    pub original_filename: String,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}
