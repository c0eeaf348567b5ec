//! Provider registry: resolves configured providers and default selections.
//!
//! Every function reads a fresh [`Settings`] snapshot supplied by the
//! caller; nothing is cached between invocations.

use std::fmt;

use serde::Deserialize;

use crate::config::Settings;

/// Id given to the provider synthesized from legacy `[openai]` settings.
pub const LEGACY_PROVIDER_ID: &str = "legacy-openai";

const LEGACY_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const LEGACY_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider type tag, dispatched through the adapter registration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
    #[serde(rename = "azure-openai")]
    AzureOpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiCompatible => "openai-compatible",
            Self::AzureOpenAi => "azure-openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured LLM backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// One model offered by a provider. Only `id` matters for invocation;
/// `name` and `group` are presentation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: Option<String>,
    pub group: Option<String>,
}

impl ModelDescriptor {
    pub fn plain(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            group: None,
        }
    }

    /// Human-facing label, falling back to the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// Legacy configurations list models as plain strings; both shapes
// normalize to the same descriptor.
impl<'de> Deserialize<'de> for ModelDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Plain(String),
            Full {
                id: String,
                #[serde(default)]
                name: Option<String>,
                #[serde(default)]
                group: Option<String>,
            },
        }

        Ok(match Entry::deserialize(deserializer)? {
            Entry::Plain(id) => ModelDescriptor::plain(id),
            Entry::Full { id, name, group } => ModelDescriptor { id, name, group },
        })
    }
}

/// List usable providers from the snapshot, in declaration order.
///
/// An empty provider list with any legacy `[openai]` field present
/// synthesizes a single `legacy-openai` provider; entries with
/// `enabled = false` are dropped.
pub fn list_providers(settings: &Settings) -> Vec<ProviderDescriptor> {
    if settings.providers.is_empty() {
        let legacy = &settings.openai;
        let has_key = legacy.api_key.as_deref().is_some_and(|s| !s.is_empty());
        let has_url = legacy.base_url.as_deref().is_some_and(|s| !s.is_empty());
        if has_key || has_url {
            return vec![ProviderDescriptor {
                id: LEGACY_PROVIDER_ID.to_string(),
                name: "OpenAI (Legacy)".to_string(),
                kind: ProviderKind::OpenAi,
                api_key: legacy.api_key.clone().unwrap_or_default(),
                base_url: Some(
                    legacy
                        .base_url
                        .clone()
                        .unwrap_or_else(|| LEGACY_DEFAULT_BASE_URL.to_string()),
                ),
                models: vec![ModelDescriptor::plain(
                    legacy.model.as_deref().unwrap_or(LEGACY_DEFAULT_MODEL),
                )],
                enabled: true,
            }];
        }
    }

    settings
        .providers
        .iter()
        .filter(|p| p.enabled)
        .cloned()
        .collect()
}

/// Look up a provider by id.
pub fn find_provider(settings: &Settings, id: &str) -> Option<ProviderDescriptor> {
    list_providers(settings).into_iter().find(|p| p.id == id)
}

/// The configured default provider, falling back to the first listed one.
pub fn default_provider(settings: &Settings) -> Option<ProviderDescriptor> {
    let providers = list_providers(settings);

    if let Some(id) = settings.default_provider_id.as_deref() {
        if let Some(p) = providers.iter().find(|p| p.id == id) {
            return Some(p.clone());
        }
    }

    providers.into_iter().next()
}

/// Default model id for a provider.
///
/// The configured `default_model` is honored only when `provider` is the
/// configured default provider and the id exists in its model list;
/// otherwise the provider's first model wins.
pub fn default_model(settings: &Settings, provider: &ProviderDescriptor) -> Option<String> {
    if settings.default_provider_id.as_deref() == Some(provider.id.as_str()) {
        if let Some(model) = settings.default_model.as_deref() {
            if provider.models.iter().any(|m| m.id == model) {
                return Some(model.to_string());
            }
        }
    }

    provider.models.first().map(|m| m.id.clone())
}
