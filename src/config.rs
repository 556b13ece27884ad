use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::CipherEngine;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_access_token_expire")]
    pub access_token_expire_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
}

/// Static file encryption key. Never logged.
#[derive(Clone, Deserialize, Default)]
pub struct CryptoConfig {
    /// 64 hex characters (AES-256)
    #[serde(default)]
    pub key: String,
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("key", &"<redacted>")
            .finish()
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1310
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_db_path() -> String {
    "data/cipherbox.db".to_string()
}

fn default_access_token_expire() -> u64 {
    60 // 1 hour
}

fn default_upload_path() -> String {
    "data/uploads".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expire_minutes: default_access_token_expire(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides(|name| env::var(name).ok());
        config.cipher()?;
        config.ensure_directories()?;
        config.ensure_jwt_secret()?;
        tracing::info!(
            "Storage root: {}, database: {}",
            config.storage.upload_path,
            config.database.path
        );
        Ok(config)
    }

    /// Build the cipher engine from the configured key. Missing or malformed keys are fatal.
    pub fn cipher(&self) -> anyhow::Result<CipherEngine> {
        if self.crypto.key.trim().is_empty() {
            anyhow::bail!("crypto.key is not set (use CB_CONF_CRYPTO_KEY or config.toml)");
        }
        CipherEngine::from_hex(&self.crypto.key)
            .map_err(|e| anyhow::anyhow!("invalid crypto.key: {}", e))
    }

    /// Ensure JWT secret is set, generating and persisting one next to the database if not
    fn ensure_jwt_secret(&mut self) -> anyhow::Result<()> {
        if !self.jwt.secret.is_empty() {
            return Ok(());
        }

        let secret_path = self.data_dir().join(".jwt_secret");
        if secret_path.exists() {
            let secret = fs::read_to_string(&secret_path)?;
            self.jwt.secret = secret.trim().to_string();
            tracing::info!("Loaded persisted JWT secret from {:?}", secret_path);
        } else {
            let secret = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
            fs::write(&secret_path, &secret)?;
            self.jwt.secret = secret;
            tracing::info!("Generated and persisted new JWT secret to {:?}", secret_path);
        }
        Ok(())
    }

    fn data_dir(&self) -> PathBuf {
        Path::new(&self.database.path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: CB_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(val) = var("CB_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("CB_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("CB_CONF_SERVER_MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.server.max_upload_bytes = bytes;
            }
        }

        // Database overrides
        if let Some(val) = var("CB_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // JWT overrides
        if let Some(val) = var("CB_CONF_JWT_SECRET") {
            self.jwt.secret = val;
        }
        if let Some(val) = var("CB_CONF_JWT_ACCESS_EXPIRE") {
            if let Ok(minutes) = val.parse() {
                self.jwt.access_token_expire_minutes = minutes;
            }
        }

        // Storage overrides
        if let Some(val) = var("CB_CONF_STORAGE_UPLOAD_PATH") {
            self.storage.upload_path = val;
        }

        // Crypto overrides
        if let Some(val) = var("CB_CONF_CRYPTO_KEY") {
            self.crypto.key = val;
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        fs::create_dir_all(self.data_dir())?;
        fs::create_dir_all(&self.storage.upload_path)?;
        Ok(())
    }
}
