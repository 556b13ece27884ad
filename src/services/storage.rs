use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{DownloadedFile, FileRecord, FileSummary, NewFileRecord, UserIdentity};
use crate::services::MetadataStore;
use crate::storage::{container, CipherEngine, LocalStorage};

/// Longest sanitized original-name suffix kept in a storage name
const MAX_NAME_SUFFIX: usize = 100;

/// Encrypted file storage: the only component that touches both disk and metadata.
pub struct StorageService {
    cipher: CipherEngine,
    disk: LocalStorage,
    metadata: Arc<dyn MetadataStore>,
}

impl StorageService {
    pub fn new(cipher: CipherEngine, disk: LocalStorage, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            cipher,
            disk,
            metadata,
        }
    }

    /// Encrypt and store a file for `owner`.
    pub async fn upload(
        &self,
        owner: &UserIdentity,
        original_name: &str,
        media_type: &str,
        plaintext: &[u8],
    ) -> Result<FileRecord> {
        let storage_name = generate_storage_name(original_name, Utc::now().timestamp());
        let path = self.disk.resolve(&storage_name).await?;

        let (ciphertext, iv) = self.cipher.encrypt(plaintext)?;
        let blob = container::wrap(&iv, &ciphertext);
        self.disk.put_new(&path, &blob).await?;

        let new_record = NewFileRecord {
            owner_id: owner.id.clone(),
            original_name: original_name.to_string(),
            storage_name,
            media_type: media_type.to_string(),
            size_bytes: plaintext.len() as i64,
            iv_hex: hex::encode(iv),
        };

        let record = match self.metadata.create(new_record).await {
            Ok(record) => record,
            Err(e) => {
                // No record points at the container, so it must not outlive this call
                if let Err(cleanup) = self.disk.delete(&path).await {
                    tracing::error!(
                        "Failed to remove orphaned container {:?}: {:?}",
                        path.as_path(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Stored file {} for user {} ({} bytes)",
            record.id,
            owner.id,
            record.size_bytes
        );
        Ok(record)
    }

    /// Decrypt one of `owner`'s files.
    pub async fn download(&self, owner: &UserIdentity, file_id: &str) -> Result<DownloadedFile> {
        let record = self.authorize_owned(owner, file_id).await?;
        let path = self.disk.resolve(&record.storage_name).await?;

        if !self.disk.exists(&path).await? {
            tracing::warn!(
                "Container for file {} is missing on disk",
                record.id
            );
            return Err(AppError::NotFound("File not found".to_string()));
        }

        let blob = self.disk.get(&path).await?;
        let (iv, ciphertext) = container::unwrap(&blob)?;
        if iv != container::parse_iv_hex(&record.iv_hex)? {
            return Err(AppError::MalformedContainer(format!(
                "IV prefix of file {} does not match its record",
                record.id
            )));
        }

        let data = self.cipher.decrypt(ciphertext, &iv)?;

        Ok(DownloadedFile {
            data,
            media_type: record.media_type,
            original_name: record.original_name,
        })
    }

    /// Delete one of `owner`'s files: container first, then the record.
    pub async fn delete(&self, owner: &UserIdentity, file_id: &str) -> Result<()> {
        let record = self.authorize_owned(owner, file_id).await?;
        let path = self.disk.resolve(&record.storage_name).await?;

        if !self.disk.delete(&path).await? {
            tracing::warn!(
                "Container for file {} was already missing; removing record",
                record.id
            );
        }

        self.metadata.delete_by_id(&record.id).await?;

        tracing::info!("Deleted file {} for user {}", record.id, owner.id);
        Ok(())
    }

    /// `owner`'s files, newest first
    pub async fn list(&self, owner: &UserIdentity) -> Result<Vec<FileSummary>> {
        self.metadata.find_all_by_owner(&owner.id).await
    }

    /// Look up a record owned by `owner`. Another user's file is reported
    /// exactly like a missing one.
    pub async fn authorize_owned(&self, owner: &UserIdentity, file_id: &str) -> Result<FileRecord> {
        match self.metadata.find_by_id(file_id).await? {
            Some(record) if record.owner_id == owner.id => Ok(record),
            _ => Err(AppError::NotFound("File not found".to_string())),
        }
    }
}

/// Build a unique on-disk name: `<unix seconds>_<random token>_<sanitized name>`.
pub fn generate_storage_name(original_name: &str, unix_seconds: i64) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        unix_seconds,
        token,
        sanitize_file_name(original_name)
    )
}

/// Map `name` onto `[A-Za-z0-9._-]`, with no `..` runs.
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len().min(MAX_NAME_SUFFIX));
    let mut chars = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .peekable();

    while let Some(c) = chars.next() {
        if sanitized.len() == MAX_NAME_SUFFIX {
            break;
        }
        if c == '.' && chars.peek() == Some(&'.') {
            while chars.peek() == Some(&'.') {
                chars.next();
            }
            sanitized.push('_');
        } else {
            sanitized.push(c);
        }
    }

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}
