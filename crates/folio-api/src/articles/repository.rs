//! Storage-agnostic article repository interface.

use async_trait::async_trait;

use folio_core::{Article, ArticleDraft};

/// Errors from article storage.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid article: {0}")]
    Invalid(String),

    #[error("Article document is corrupt: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<folio_core::Error> for RepositoryError {
    fn from(err: folio_core::Error) -> Self {
        match err {
            folio_core::Error::InvalidArticle(msg) => Self::Invalid(msg),
            other @ folio_core::Error::Config(_) => Self::Invalid(other.to_string()),
        }
    }
}

/// Whole-collection article storage.
///
/// Writes replace the entire collection; there are no partial updates and
/// no conflict detection between writers.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// All articles in stored order; empty when nothing was ever saved.
    async fn list(&self) -> Result<Vec<Article>, RepositoryError>;

    /// Replace the article whose id the draft carries, or append a new one.
    async fn upsert(&self, draft: ArticleDraft) -> Result<Article, RepositoryError>;

    /// Remove an article. Returns whether anything was removed; an unknown id
    /// is not an error.
    async fn remove(&self, id: i64) -> Result<bool, RepositoryError>;
}
