use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{FileRecord, FileSummary, NewFileRecord};

/// File metadata persistence used by the storage service
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record, assigning its id and creation time
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord>;

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>>;

    /// Owner's files, newest first
    async fn find_all_by_owner(&self, owner_id: &str) -> Result<Vec<FileSummary>>;

    async fn delete_by_id(&self, id: &str) -> Result<()>;
}

/// SQLite-backed metadata store
#[derive(Clone)]
pub struct SqliteMetadataStore {
    db: Database,
}

impl SqliteMetadataStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord> {
        let file = FileRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: record.owner_id,
            original_name: record.original_name,
            storage_name: record.storage_name,
            media_type: record.media_type,
            size_bytes: record.size_bytes,
            iv_hex: record.iv_hex,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        sqlx::query(
            r#"
            INSERT INTO files (id, owner_id, original_name, storage_name, media_type, size_bytes, iv_hex, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.id)
        .bind(&file.owner_id)
        .bind(&file.original_name)
        .bind(&file.storage_name)
        .bind(&file.media_type)
        .bind(file.size_bytes)
        .bind(&file.iv_hex)
        .bind(&file.created_at)
        .execute(self.db.pool())
        .await?;

        Ok(file)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        let file: Option<FileRecord> = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(file)
    }

    async fn find_all_by_owner(&self, owner_id: &str) -> Result<Vec<FileSummary>> {
        let files: Vec<FileSummary> = sqlx::query_as(
            r#"
            SELECT id, original_name, media_type, size_bytes, created_at
            FROM files
            WHERE owner_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(files)
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}
