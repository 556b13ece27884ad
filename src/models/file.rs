use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for one encrypted file
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub owner_id: String,
    pub original_name: String,
    /// On-disk filename inside the upload root
    pub storage_name: String,
    pub media_type: String,
    /// Plaintext size
    pub size_bytes: i64,
    pub iv_hex: String,
    pub created_at: String,
}

/// Fields supplied by the storage service when creating a record
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: String,
    pub original_name: String,
    pub storage_name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub iv_hex: String,
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub original_name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            original_name: record.original_name,
            media_type: record.media_type,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
        }
    }
}

/// Upload response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub storage_name: String,
    pub original_name: String,
    pub size_bytes: i64,
}

impl From<FileRecord> for UploadResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            storage_name: record.storage_name,
            original_name: record.original_name,
            size_bytes: record.size_bytes,
        }
    }
}

/// File list response
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileSummary>,
}

/// Decrypted file plus the metadata needed to serve it
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub data: Vec<u8>,
    pub media_type: String,
    pub original_name: String,
}
