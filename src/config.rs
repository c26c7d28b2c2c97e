//! Runtime settings for manifest and asset resolution.
//!
//! Values are resolved in priority order: CLI flag, JSON config file,
//! environment variable, built-in default. Resolution is pure so tests can
//! feed an explicit environment.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Repository serving `content.json` and every per-version model asset.
pub const DEFAULT_REPO_ROOT: &str = "https://raw.githubusercontent.com/CBIIT/crdc-datahub-models";
/// Deployment tier used when nothing else is configured.
pub const DEFAULT_TIER: &str = "prod";

pub const ENV_REPO_ROOT: &str = "CDEX_REPO_ROOT";
pub const ENV_TIER: &str = "CDEX_TIER";
pub const ENV_SESSION_DIR: &str = "CDEX_SESSION_DIR";

/// Optional on-disk settings file (`--config`).
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub repo_root: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
}

/// Explicit overrides, usually taken from CLI flags.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub repo_root: Option<String>,
    pub tier: Option<String>,
    pub session_dir: Option<PathBuf>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    repo_root: String,
    tier: String,
    session_dir: PathBuf,
}

impl Settings {
    /// Build settings directly, normalizing the repo root.
    pub fn new(repo_root: &str, tier: &str, session_dir: PathBuf) -> Result<Self> {
        let settings = Self {
            repo_root: repo_root.trim().trim_end_matches('/').to_string(),
            tier: tier.trim().to_string(),
            session_dir,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve settings from overrides, an optional file, and an environment lookup.
    pub fn resolve<F>(
        overrides: &SettingsOverrides,
        file: Option<&SettingsFile>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.cloned().unwrap_or_default();
        let repo_root = overrides
            .repo_root
            .clone()
            .or(file.repo_root)
            .or_else(|| non_empty(env(ENV_REPO_ROOT)))
            .unwrap_or_else(|| DEFAULT_REPO_ROOT.to_string());
        let tier = overrides
            .tier
            .clone()
            .or(file.tier)
            .or_else(|| non_empty(env(ENV_TIER)))
            .unwrap_or_else(|| DEFAULT_TIER.to_string());
        let session_dir = overrides
            .session_dir
            .clone()
            .or(file.session_dir)
            .or_else(|| non_empty(env(ENV_SESSION_DIR)).map(PathBuf::from))
            .unwrap_or_else(default_session_dir);
        Self::new(&repo_root, &tier, session_dir)
    }

    /// Resolve against the process environment.
    pub fn from_process(overrides: &SettingsOverrides, config_path: Option<&Path>) -> Result<Self> {
        let file = config_path.map(load_settings_file).transpose()?;
        Self::resolve(overrides, file.as_ref(), |key| std::env::var(key).ok())
    }

    pub fn repo_root(&self) -> &str {
        &self.repo_root
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// `{repoRoot}/{tier}/cache/content.json`
    pub fn manifest_url(&self) -> String {
        format!("{}/{}/cache/content.json", self.repo_root, self.tier)
    }

    /// `{repoRoot}/{tier}/cache/{model}/{version}/{filename}`
    pub fn asset_url(&self, model: &str, version: &str, filename: &str) -> String {
        format!(
            "{}/{}/cache/{}/{}/{}",
            self.repo_root, self.tier, model, version, filename
        )
    }

    fn validate(&self) -> Result<()> {
        if self.repo_root.is_empty() {
            return Err(anyhow!("repo_root must be non-empty"));
        }
        if self.tier.is_empty() {
            return Err(anyhow!("tier must be non-empty"));
        }
        if self.tier.contains('/') {
            return Err(anyhow!("tier must not contain '/' (got {:?})", self.tier));
        }
        Ok(())
    }
}

/// Load a settings file, rejecting unknown keys.
pub fn load_settings_file(path: &Path) -> Result<SettingsFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let file: SettingsFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(file)
}

fn default_session_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cdex")
        .join("session")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
