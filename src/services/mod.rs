pub mod auth;
pub mod metadata;
pub mod storage;

pub use auth::AuthService;
pub use metadata::{MetadataStore, SqliteMetadataStore};
pub use storage::StorageService;
