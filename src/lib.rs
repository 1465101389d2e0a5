pub mod api;
pub mod blob;
pub mod circleci;
pub mod db;
pub mod error;
pub mod freeze;
pub mod github;
pub mod logging;
pub mod reports;
pub mod standard;
pub mod summary;
pub mod utils;
pub mod webhook;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::circleci::CiPlatform;
use crate::db::ConfigStore;
use crate::error::HooksError;
use crate::github::SourceControl;
use crate::standard::{DEFAULT_PATTERNS, StandardRules};

const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_CIRCLECI_API: &str = "https://circleci.com/api/v1.1";
const DEFAULT_FREEZE_MESSAGE: &str =
    "Code freeze is enabled. Merging is blocked until it is disabled.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HooksConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub circleci: CircleCiConfig,
    #[serde(default)]
    pub standard: StandardConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub code_freeze: CodeFreezeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    /// Login of the bot account; only its comments are edited or deleted.
    pub user: Option<String>,
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API.to_string(),
            user: None,
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CircleCiConfig {
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CIRCLECI_API.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StandardConfig {
    pub check_name: String,
    pub docs_link: String,
    pub patterns: Vec<String>,
}

impl Default for StandardConfig {
    fn default() -> Self {
        Self {
            check_name: "PR standard".to_string(),
            docs_link: String::new(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QualityConfig {
    pub check_prefix: String,
    pub coverage_threshold: u32,
    pub quality_threshold: u32,
    pub webhook_secret: Option<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            check_prefix: "FineTune".to_string(),
            coverage_threshold: 80,
            quality_threshold: 100,
            webhook_secret: None,
        }
    }
}

impl QualityConfig {
    /// Returns true if a valid (non-empty) webhook_secret is set.
    pub fn has_valid_secret(&self) -> bool {
        self.webhook_secret
            .as_ref()
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CodeFreezeConfig {
    pub check_name: String,
    pub message: String,
    /// Repositories as `owner/name`
    pub repositories: Vec<String>,
    pub authorized_users: Vec<String>,
}

impl Default for CodeFreezeConfig {
    fn default() -> Self {
        Self {
            check_name: "Code Freeze".to_string(),
            message: DEFAULT_FREEZE_MESSAGE.to_string(),
            repositories: Vec::new(),
            authorized_users: Vec::new(),
        }
    }
}

impl CodeFreezeConfig {
    pub fn is_authorized(&self, user_name: &str) -> bool {
        self.authorized_users.iter().any(|u| u == user_name)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    /// Root of the `<prefix>/<commit sha>` report tree
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("delivery_hooks.db"),
            reports_dir: PathBuf::from("quality-reports"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_files: 5,
        }
    }
}

/// Load and parse the configuration file, then apply secrets from the
/// environment (`GITHUB_TOKEN`, `CIRCLECI_TOKEN`, `WEBHOOK_SECRET`).
pub fn load_config(path: impl AsRef<Path>) -> Result<HooksConfig, HooksError> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        HooksError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;

    let mut config: HooksConfig = toml::from_str(&config_str).map_err(|e| {
        HooksError::ConfigError(format!("Failed to parse config file '{}': {}", path.display(), e))
    })?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut HooksConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(token) = env("GITHUB_TOKEN") {
        config.github.token = Some(token);
    }
    if let Some(token) = env("CIRCLECI_TOKEN") {
        config.circleci.token = Some(token);
    }
    if let Some(secret) = env("WEBHOOK_SECRET") {
        config.quality.webhook_secret = Some(secret);
    }
}

pub struct AppState {
    pub config: HooksConfig,
    pub rules: StandardRules,
    pub github: Arc<dyn SourceControl>,
    pub store: Arc<dyn ConfigStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub ci: Arc<dyn CiPlatform>,
}

impl AppState {
    /// Validates the configuration and wires the collaborators together.
    pub fn new(
        config: HooksConfig,
        github: Arc<dyn SourceControl>,
        store: Arc<dyn ConfigStore>,
        blobs: Arc<dyn BlobStore>,
        ci: Arc<dyn CiPlatform>,
    ) -> Result<Self, HooksError> {
        if !config.quality.has_valid_secret() {
            return Err(HooksError::ConfigError(
                "quality.webhook_secret (or WEBHOOK_SECRET) must be set".to_string(),
            ));
        }
        let rules = StandardRules::new(&config.standard.patterns)?;

        Ok(Self {
            config,
            rules,
            github,
            store,
            blobs,
            ci,
        })
    }
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_uses_defaults() {
        let config: HooksConfig = toml::from_str("").unwrap();
        assert_eq!(config.github.api_url, DEFAULT_GITHUB_API);
        assert_eq!(config.standard.check_name, "PR standard");
        assert_eq!(config.standard.patterns.len(), DEFAULT_PATTERNS.len());
        assert_eq!(config.quality.coverage_threshold, 80);
        assert_eq!(config.quality.quality_threshold, 100);
        assert_eq!(config.code_freeze.check_name, "Code Freeze");
        assert!(!config.quality.has_valid_secret());
    }

    #[test]
    fn parses_sections() {
        let config: HooksConfig = toml::from_str(
            r#"
            [github]
            user = "finetune-bot"

            [quality]
            coverage_threshold = 70
            webhook_secret = "s3cret"

            [code_freeze]
            repositories = ["org/api", "org/web"]
            authorized_users = ["ana"]
            "#,
        )
        .unwrap();

        assert_eq!(config.github.user.as_deref(), Some("finetune-bot"));
        assert_eq!(config.quality.coverage_threshold, 70);
        assert_eq!(config.quality.quality_threshold, 100);
        assert!(config.quality.has_valid_secret());
        assert_eq!(config.code_freeze.repositories, ["org/api", "org/web"]);
        assert!(config.code_freeze.is_authorized("ana"));
        assert!(!config.code_freeze.is_authorized("bob"));
    }

    #[test]
    fn environment_overrides_secrets() {
        let env: HashMap<&str, &str> = [("GITHUB_TOKEN", "gh"), ("WEBHOOK_SECRET", "env-secret")]
            .into_iter()
            .collect();
        let mut config = HooksConfig::default();
        config.quality.webhook_secret = Some("file-secret".to_string());

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.github.token.as_deref(), Some("gh"));
        assert_eq!(config.circleci.token, None);
        assert_eq!(config.quality.webhook_secret.as_deref(), Some("env-secret"));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, HooksError::ConfigError(_)));
    }
}
