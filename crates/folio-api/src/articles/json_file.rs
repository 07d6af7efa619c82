//! Article repository backed by a single JSON document.
//!
//! Every write reads the whole array, modifies it and writes it back through
//! a staging file renamed over the document, so readers always see a whole
//! document. Writes made through one repository are serialized; separate
//! processes sharing the document are not coordinated, so the last writer
//! wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use folio_core::clock::day_of;
use folio_core::{Article, ArticleDraft, Clock};

use super::repository::{ArticleRepository, RepositoryError};

pub struct JsonFileRepository {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the next document is written to before it replaces `path`.
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "articles.json".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    async fn load(&self) -> Result<Vec<Article>, RepositoryError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).map_err(|e| {
            RepositoryError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn store(&self, articles: &[Article]) -> Result<(), RepositoryError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(articles)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        // Readers never take the lock; they must see either the old or the
        // new document, so write aside and rename over.
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        debug!(path = %self.path.display(), count = articles.len(), "Article document written");
        Ok(())
    }
}

/// First id at or after `now` not already taken.
fn next_id(articles: &[Article], now: i64) -> i64 {
    let mut id = now;
    while articles.iter().any(|a| a.id == id) {
        id += 1;
    }
    id
}

#[async_trait]
impl ArticleRepository for JsonFileRepository {
    async fn list(&self) -> Result<Vec<Article>, RepositoryError> {
        self.load().await
    }

    async fn upsert(&self, draft: ArticleDraft) -> Result<Article, RepositoryError> {
        draft.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut articles = self.load().await?;

        let existing = match draft.id {
            Some(id) => articles.iter_mut().find(|a| a.id == id),
            None => None,
        };

        let article = if let Some(slot) = existing {
            let updated = draft.into_article(slot.id, slot.date.clone());
            *slot = updated.clone();
            info!(id = updated.id, slug = %updated.slug, "Article updated");
            updated
        } else {
            let now = self.clock.now_millis();
            let created = draft.into_article(next_id(&articles, now), day_of(now));
            articles.push(created.clone());
            info!(id = created.id, slug = %created.slug, "Article created");
            created
        };

        self.store(&articles).await?;
        Ok(article)
    }

    async fn remove(&self, id: i64) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut articles = self.load().await?;
        let before = articles.len();
        articles.retain(|a| a.id != id);
        let removed = articles.len() != before;

        self.store(&articles).await?;
        info!(id, removed, "Article delete processed");
        Ok(removed)
    }
}
