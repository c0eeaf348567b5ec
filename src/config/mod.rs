//! Configuration snapshots.
//!
//! All registry and prompt lookups operate on an immutable [`Settings`]
//! snapshot taken at the start of a call, so configuration edits between
//! invocations are always picked up and the resolution logic stays testable
//! without touching the filesystem or process environment.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::{DifftideError, Result};
use crate::prompt::PromptStrategy;
use crate::registry::ProviderDescriptor;

fn default_rule_dirs() -> Vec<String> {
    vec![".difftide-rules".to_string()]
}

fn default_workspace_prompt_file() -> String {
    "workspace.prompt.md".to_string()
}

/// One immutable configuration snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Configured providers, in declaration order.
    pub providers: Vec<ProviderDescriptor>,
    /// Id of the provider used when the caller does not pick one.
    pub default_provider_id: Option<String>,
    /// Model id honored only for the default provider.
    pub default_model: Option<String>,
    /// BCP-47 tag selecting the bundled prompt template.
    pub language: Option<String>,
    /// User-supplied instruction prompt.
    pub custom_prompt: Option<String>,
    /// Which prompt tier wins when both rules and a custom prompt exist.
    pub prompt_strategy: PromptStrategy,
    /// Workspace-relative directories scanned for `.md` rule files.
    pub rule_dirs: Vec<String>,
    /// Filename looked up inside the rule directories for a full
    /// prompt override.
    pub workspace_prompt_file: String,
    /// Legacy single-provider fields, kept for configurations written
    /// before the provider list existed.
    pub openai: LegacyOpenAi,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            default_provider_id: None,
            default_model: None,
            language: None,
            custom_prompt: None,
            prompt_strategy: PromptStrategy::default(),
            rule_dirs: default_rule_dirs(),
            workspace_prompt_file: default_workspace_prompt_file(),
            openai: LegacyOpenAi::default(),
        }
    }
}

/// Legacy single-provider configuration (`[openai]` table).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyOpenAi {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Settings {
    /// Load settings from the given TOML file, or from the default
    /// per-user config path when `path` is `None`. A missing file yields
    /// defaults; a malformed file is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.is_file() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let mut settings: Settings = toml::from_str(&raw).map_err(|e| {
            DifftideError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        settings.apply_env();
        Ok(settings)
    }

    /// Default config file location (`<config dir>/difftide/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "difftide").map(|d| d.config_dir().join("config.toml"))
    }

    /// Fill credentials from the environment (and `.env` if present).
    ///
    /// `OPENAI_API_KEY` / `OPENAI_BASE_URL` back-fill the legacy fields;
    /// per-provider keys come from `DIFFTIDE_API_KEY_<ID>` with the id
    /// uppercased and dashes replaced by underscores.
    pub fn apply_env(&mut self) {
        let _ = dotenvy::dotenv();

        if self.openai.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.openai.api_key = Some(key);
            }
        }
        if self.openai.base_url.is_none() {
            if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
                self.openai.base_url = Some(url);
            }
        }

        for provider in &mut self.providers {
            if provider.api_key.is_empty() {
                let var = format!(
                    "DIFFTIDE_API_KEY_{}",
                    provider.id.to_uppercase().replace('-', "_")
                );
                if let Ok(key) = std::env::var(&var) {
                    provider.api_key = key;
                }
            }
        }
    }
}
