use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod local;
pub mod memory;
pub mod sqlite;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub enum StoreConfig {
    Local { path: PathBuf },
    Sqlite { url: String },
    Memory,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Persistent string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

pub async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config {
        StoreConfig::Local { path } => Arc::new(LocalStore::load(path)?),
        StoreConfig::Sqlite { url } => Arc::new(SqliteStore::connect(url).await?),
        StoreConfig::Memory => Arc::new(MemoryStore::default()),
    };
    Ok(store)
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("store lock poisoned".to_string())
}
