//! CLI configuration management.
//!
//! Persists server URLs and the session token to `~/.folio/config.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use folio_core::config::{DEFAULT_API_PORT, DEFAULT_CONTROLLER_PORT};

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Content API base URL (e.g., "<http://localhost:3001>").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Lifecycle controller base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_url: Option<String>,
    /// Session token from the last successful `otp verify`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl CliConfig {
    /// Path to the config directory: `~/.folio/`.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".folio"))
    }

    /// Path to the config file: `~/.folio/config.json`.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.json"))
    }

    /// Load config from disk. Returns default if file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{DEFAULT_API_PORT}"))
    }

    pub fn controller_url(&self) -> String {
        self.controller_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{DEFAULT_CONTROLLER_PORT}"))
    }

    /// Stored session token, or an error telling the user how to get one.
    pub fn require_token(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `folio otp send` then `folio otp verify <code>`"))
    }

    /// Layer one-off URL overrides over the stored values. The result is
    /// for this invocation only and must not be saved.
    #[must_use]
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        controller_url: Option<String>,
    ) -> Self {
        if api_url.is_some() {
            self.api_url = api_url;
        }
        if controller_url.is_some() {
            self.controller_url = controller_url;
        }
        self
    }

    /// Replace the session token in `~/.folio/config.json`; `None` logs out.
    pub fn save_token(token: Option<String>) -> anyhow::Result<()> {
        let path =
            Self::config_path().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Self::save_token_to(&path, token)
    }

    /// Rewrite only the token field of the file at `path`.
    pub fn save_token_to(path: &Path, token: Option<String>) -> anyhow::Result<()> {
        let mut stored = Self::load_from(path);
        stored.token = token;
        stored.save_to(path)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_localhost() {
        let cfg = CliConfig::default();
        assert_eq!(cfg.api_url(), "http://localhost:3001");
        assert_eq!(cfg.controller_url(), "http://localhost:3000");
        assert!(cfg.require_token().is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = CliConfig {
            api_url: Some("http://cms.test:3001".into()),
            token: Some("ab12".into()),
            ..Default::default()
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(CliConfig::load_from(&path), cfg);
    }

    #[test]
    fn invalid_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(CliConfig::load_from(&path), CliConfig::default());
    }

    #[test]
    fn overrides_replace_only_what_is_given() {
        let stored = CliConfig {
            api_url: Some("http://cms.test:3001".into()),
            controller_url: Some("http://ctl.test:3000".into()),
            token: Some("t".into()),
        };
        let effective = stored
            .clone()
            .with_overrides(Some("http://other:9000".into()), None);
        assert_eq!(effective.api_url(), "http://other:9000");
        assert_eq!(effective.controller_url(), "http://ctl.test:3000");
        assert_eq!(effective.token, stored.token);
    }

    #[test]
    fn saving_a_token_keeps_stored_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let stored = CliConfig {
            api_url: Some("http://cms.test:3001".into()),
            ..Default::default()
        };
        stored.save_to(&path).unwrap();

        // The login ran against a one-off URL; only the token may reach disk.
        let effective = CliConfig::load_from(&path).with_overrides(
            Some("http://elsewhere:9000".into()),
            Some("http://ctl.elsewhere:9001".into()),
        );
        assert_eq!(effective.api_url(), "http://elsewhere:9000");
        CliConfig::save_token_to(&path, Some("ab12".into())).unwrap();

        let reloaded = CliConfig::load_from(&path);
        assert_eq!(reloaded.api_url.as_deref(), Some("http://cms.test:3001"));
        assert!(reloaded.controller_url.is_none());
        assert_eq!(reloaded.token.as_deref(), Some("ab12"));
    }

    #[test]
    fn logout_removes_only_the_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        CliConfig {
            token: Some("t".into()),
            ..Default::default()
        }
        .save_to(&path)
        .unwrap();

        CliConfig::save_token_to(&path, None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
