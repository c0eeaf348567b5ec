//! Gemini adapter.
//!
//! Generation falls back to the OpenAI-compatible transport when a base
//! URL (proxy) is configured; model discovery talks to the native
//! Generative Language API, which authenticates with a `key` query
//! parameter instead of a header.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{DifftideError, Result};
use crate::registry::{ModelDescriptor, ProviderDescriptor};

use super::http::shared_client;
use super::openai::OpenAiTransport;
use super::{validate_base_url, ModelHandle, ProviderAdapter};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter;

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn create_model(&self, provider: &ProviderDescriptor, model_id: &str) -> Result<ModelHandle> {
        match provider.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                let base_url = validate_base_url(url)?;
                Ok(Box::new(OpenAiTransport::new(
                    provider.name.clone(),
                    model_id,
                    provider.api_key.clone(),
                    base_url,
                )))
            }
            _ => Err(DifftideError::Configuration(
                "Gemini native support not implemented. \
                 Use an OpenAI-compatible proxy and provide a base_url."
                    .to_string(),
            )),
        }
    }

    async fn fetch_models(&self, provider: &ProviderDescriptor) -> Result<Vec<ModelDescriptor>> {
        let base_url = match provider.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => validate_base_url(url)?,
            _ => DEFAULT_BASE_URL.to_string(),
        };
        let url = format!("{base_url}/models?key={}", provider.api_key);

        let resp = shared_client().get(&url).send().await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status != 200 {
            return Err(DifftideError::api(status, body));
        }

        let envelope: GeminiModelsEnvelope = serde_json::from_str(&body)?;
        let models = envelope.models.ok_or_else(|| {
            DifftideError::api(
                status,
                format!("missing `models` array in models response: {body}"),
            )
        })?;

        Ok(models
            .into_iter()
            .map(|m| {
                // Native ids come prefixed, e.g. "models/gemini-pro".
                let id = m
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&m.name)
                    .to_string();
                let name = m.display_name.unwrap_or_else(|| m.name.clone());
                ModelDescriptor {
                    id,
                    name: Some(name),
                    group: None,
                }
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct GeminiModelsEnvelope {
    models: Option<Vec<GeminiModel>>,
}

#[derive(Deserialize)]
struct GeminiModel {
    name: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}
