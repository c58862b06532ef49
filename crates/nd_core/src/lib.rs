pub mod cleaning;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use models::Summarizer;
pub use storage::DocumentStore;
pub use types::{
    ArticleRecord, BulkWriteResult, Enrichment, RawArticle, Sentiment, SourceConfig, SourceName,
    StoredArticle, WriteError,
};

pub mod prelude {
    pub use super::cleaning::{clean, parse_timestamp};
    pub use super::validation::is_valid;
    pub use super::{ArticleRecord, DocumentStore, Error, RawArticle, Result, SourceConfig, SourceName};
}
