use std::path::PathBuf;
use std::sync::Arc;

use nd_core::{DocumentStore, Result};
use serde::{Deserialize, Serialize};

pub mod backends;
pub mod upsert;

pub use backends::*;
pub use upsert::{ArticleUpserter, UpsertSummary};

/// Which document store to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Sqlite { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl StorageConfig {
    pub async fn open(&self) -> Result<Arc<dyn DocumentStore>> {
        match self {
            StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
            #[cfg(feature = "sqlite")]
            StorageConfig::Sqlite { path } => Ok(Arc::new(SqliteStore::new_with_path(path).await?)),
            #[cfg(not(feature = "sqlite"))]
            StorageConfig::Sqlite { .. } => Err(nd_core::Error::Config(
                "SQLite storage requires the `sqlite` feature".to_string(),
            )),
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{ArticleUpserter, StorageConfig, UpsertSummary};
}
