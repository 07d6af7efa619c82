//! Article model.
//!
//! Articles are stored and exchanged as camelCase JSON objects. Fields the
//! backend does not interpret are carried through untouched in `extra`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Words per minute used by the read-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

#[allow(clippy::unwrap_used)]
static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

#[allow(clippy::unwrap_used)]
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// A stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Creation time in Unix milliseconds.
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub category: String,
    /// Creation day, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub read_time: String,
    /// Rich-text (HTML) body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Article fields as submitted by an editor.
///
/// A draft carrying the id of an existing article replaces it; any other
/// draft becomes a new article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleDraft {
    /// Draft with only a title set.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Reject drafts that cannot produce a slug.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidArticle("Article title is required".into()));
        }
        Ok(())
    }

    /// Materialize the draft under the given identity.
    ///
    /// The slug is always derived from the title; a missing read time is
    /// estimated from the content.
    pub fn into_article(mut self, id: i64, date: String) -> Article {
        // Identity fields are owned by the store, never by the payload.
        for key in ["id", "slug", "date"] {
            self.extra.remove(key);
        }
        let read_time = self
            .read_time
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| estimate_read_time(&self.content));
        Article {
            id,
            slug: slugify(&self.title),
            title: self.title,
            excerpt: self.excerpt,
            category: self.category,
            date,
            read_time,
            content: self.content,
            featured: self.featured,
            extra: self.extra,
        }
    }
}

/// Derive a URL slug: lowercase, every run of non-`[a-z0-9]` becomes `-`.
pub fn slugify(title: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(&title.to_lowercase(), "-")
        .into_owned()
}

/// Estimate reading time of an HTML body as `"N min read"`.
pub fn estimate_read_time(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, "");
    let words = text.split_whitespace().count().max(1);
    let minutes = words.div_ceil(WORDS_PER_MINUTE);
    format!("{minutes} min read")
}
