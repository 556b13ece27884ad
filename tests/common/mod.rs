//! Shared test utilities.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cipherbox::config::Config;
use cipherbox::db::Database;
use cipherbox::error::{AppError, Result};
use cipherbox::models::{
    CreateUserRequest, FileRecord, FileSummary, NewFileRecord, UserIdentity,
};
use cipherbox::services::{AuthService, MetadataStore, SqliteMetadataStore, StorageService};
use cipherbox::storage::{CipherEngine, LocalStorage, PathGuard};
use cipherbox::{create_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub const BOUNDARY: &str = "cipherbox-test-boundary";

pub fn test_config(dir: &Path) -> Config {
    let upload_path = dir.join("uploads");
    std::fs::create_dir_all(&upload_path).expect("Failed to create upload directory");

    let mut config = Config::default();
    config.database.path = dir.join("cipherbox.db").to_string_lossy().into_owned();
    config.storage.upload_path = upload_path.to_string_lossy().into_owned();
    config.jwt.secret = "test-jwt-secret".to_string();
    config.crypto.key = TEST_KEY_HEX.to_string();
    config
}

/// The full HTTP application over a temporary directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config = test_config(temp_dir.path());
        let upload_dir = PathBuf::from(&config.storage.upload_path);

        let state = AppState::build(config)
            .await
            .expect("Failed to build app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            upload_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Register a user and return a bearer token for them.
    pub async fn login_as(&self, email: &str) -> String {
        let credentials = json!({ "email": email, "password": "password123" });

        let (status, _) = self
            .json_request("POST", "/api/v1/auth/register", Some(credentials.clone()), None)
            .await;
        assert_eq!(status, StatusCode::OK, "register failed for {}", email);

        let (status, body) = self
            .json_request("POST", "/api/v1/auth/login", Some(credentials), None)
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {}", email);

        body["data"]["access_token"]
            .as_str()
            .expect("missing access token")
            .to_string()
    }

    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        auth_token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let (status, _, bytes) = self.send(builder.body(body).unwrap()).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// POST a multipart upload with a single `file` field.
    pub async fn upload(
        &self,
        token: Option<&str>,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let body = multipart_body(&[Part::File {
            name: "file",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }]);
        self.multipart_request(token, body).await
    }

    pub async fn multipart_request(&self, token: Option<&str>, body: Vec<u8>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/files")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let (status, _, bytes) = self.send(builder.body(Body::from(body)).unwrap()).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// GET /api/v1/files/:id, returning status, headers and raw body.
    pub async fn download(
        &self,
        token: &str,
        id: &str,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/v1/files/{}", id))
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn send(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes.to_vec())
    }

    pub fn stored_files(&self) -> Vec<PathBuf> {
        stored_files(&self.upload_dir)
    }
}

pub enum Part<'a> {
    /// `None` leaves the `filename` parameter or `Content-Type` line out.
    File {
        name: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                let mut headers = format!("Content-Disposition: form-data; name=\"{}\"", name);
                if let Some(file_name) = file_name {
                    headers.push_str(&format!("; filename=\"{}\"", file_name));
                }
                headers.push_str("\r\n");
                if let Some(content_type) = content_type {
                    headers.push_str(&format!("Content-Type: {}\r\n", content_type));
                }
                headers.push_str("\r\n");

                body.extend_from_slice(headers.as_bytes());
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn stored_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

pub fn test_cipher() -> CipherEngine {
    CipherEngine::from_hex(TEST_KEY_HEX).unwrap()
}

/// A storage service over SQLite metadata in a temporary directory.
pub struct ServiceFixture {
    pub service: StorageService,
    pub db: Database,
    pub metadata: Arc<SqliteMetadataStore>,
    pub upload_dir: PathBuf,
    _temp_dir: TempDir,
}

impl ServiceFixture {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config = test_config(temp_dir.path());
        let upload_dir = PathBuf::from(&config.storage.upload_path);

        let db = Database::new(&config.database.path)
            .await
            .expect("Failed to open database");
        db.run_migrations().await.expect("Failed to migrate");

        let metadata = Arc::new(SqliteMetadataStore::new(db.clone()));
        let service = StorageService::new(
            test_cipher(),
            LocalStorage::new(PathGuard::new(&upload_dir).unwrap()),
            metadata.clone(),
        );

        Self {
            service,
            db,
            metadata,
            upload_dir,
            _temp_dir: temp_dir,
        }
    }

    pub async fn user(&self, email: &str) -> UserIdentity {
        let user = AuthService::register(
            &self.db,
            CreateUserRequest {
                email: email.to_string(),
                password: "password123".to_string(),
                full_name: None,
            },
        )
        .await
        .expect("Failed to register user");

        UserIdentity {
            id: user.id,
            email: user.email,
        }
    }

    pub fn stored_files(&self) -> Vec<PathBuf> {
        stored_files(&self.upload_dir)
    }
}

/// Metadata store double that can be told to fail record creation.
#[derive(Default)]
pub struct FakeMetadataStore {
    pub fail_create: bool,
    pub create_calls: AtomicUsize,
}

impl FakeMetadataStore {
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Default::default()
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(AppError::Metadata(sqlx::Error::PoolClosed));
        }
        Ok(FileRecord {
            id: "fake-id".to_string(),
            owner_id: record.owner_id,
            original_name: record.original_name,
            storage_name: record.storage_name,
            media_type: record.media_type,
            size_bytes: record.size_bytes,
            iv_hex: record.iv_hex,
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
        })
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<FileRecord>> {
        Ok(None)
    }

    async fn find_all_by_owner(&self, _owner_id: &str) -> Result<Vec<FileSummary>> {
        Ok(Vec::new())
    }

    async fn delete_by_id(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}
