//! Article subcommands: list, save, delete.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;

use folio_core::ArticleDraft;

use crate::client::ContentClient;
use crate::config::CliConfig;

/// Article subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ArticlesAction {
    /// List stored articles.
    List {
        /// Print the raw JSON array.
        #[arg(long)]
        json: bool,
    },
    /// Create an article, or replace one when `--id` matches.
    Save {
        /// Read the article fields from a JSON file; flags override it.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// HTML body read from a file.
        #[arg(long)]
        content_file: Option<PathBuf>,
        #[arg(long)]
        featured: bool,
    },
    /// Delete an article by id.
    Delete { id: i64 },
}

/// Execute an articles subcommand.
pub async fn run(action: ArticlesAction, config: &CliConfig) -> anyhow::Result<()> {
    let api = ContentClient::new(&config.api_url())?;
    let mut out = io::stdout();
    match action {
        ArticlesAction::List { json } => {
            let articles = api.list_articles().await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&articles)?)?;
            } else if articles.is_empty() {
                writeln!(out, "No articles")?;
            } else {
                for a in &articles {
                    let star = if a.featured { "*" } else { " " };
                    writeln!(out, "{star} {:<15} {}  {}  ({})", a.id, a.date, a.title, a.slug)?;
                }
            }
        }
        ArticlesAction::Save {
            file,
            id,
            title,
            excerpt,
            category,
            content_file,
            featured,
        } => {
            let mut draft = match file {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
                None => ArticleDraft::default(),
            };
            apply_overrides(&mut draft, id, title, excerpt, category, featured);
            if let Some(path) = content_file {
                draft.content = std::fs::read_to_string(path)?;
            }
            let article = api.save_article(config.require_token()?, &draft).await?;
            writeln!(out, "Saved article {} ({})", article.id, article.slug)?;
        }
        ArticlesAction::Delete { id } => {
            api.delete_article(config.require_token()?, id).await?;
            writeln!(out, "Deleted article {id}")?;
        }
    }
    Ok(())
}

/// Layer command-line flags over a draft loaded from file.
pub fn apply_overrides(
    draft: &mut ArticleDraft,
    id: Option<i64>,
    title: Option<String>,
    excerpt: Option<String>,
    category: Option<String>,
    featured: bool,
) {
    if id.is_some() {
        draft.id = id;
    }
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(excerpt) = excerpt {
        draft.excerpt = excerpt;
    }
    if let Some(category) = category {
        draft.category = category;
    }
    if featured {
        draft.featured = true;
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_fields() {
        let mut draft = ArticleDraft {
            excerpt: "from file".into(),
            ..ArticleDraft::titled("File Title")
        };
        apply_overrides(&mut draft, Some(7), Some("Flag Title".into()), None, None, true);
        assert_eq!(draft.id, Some(7));
        assert_eq!(draft.title, "Flag Title");
        assert_eq!(draft.excerpt, "from file");
        assert!(draft.featured);
    }

    #[test]
    fn absent_flags_leave_draft_alone() {
        let original = ArticleDraft::titled("Keep");
        let mut draft = original.clone();
        apply_overrides(&mut draft, None, None, None, None, false);
        assert_eq!(draft, original);
    }
}
