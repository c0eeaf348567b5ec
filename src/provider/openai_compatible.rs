//! Adapter for endpoints speaking the OpenAI wire format behind a
//! mandatory base URL. Also registered for the Azure and Anthropic
//! provider types, which differ only in the error raised when no base
//! URL is configured.

use async_trait::async_trait;

use crate::error::{DifftideError, Result};
use crate::registry::{ModelDescriptor, ProviderDescriptor};

use super::openai::{fetch_openai_models, OpenAiTransport};
use super::{validate_base_url, ModelHandle, ProviderAdapter};

pub struct OpenAiCompatibleAdapter {
    missing_base_url: &'static str,
}

impl OpenAiCompatibleAdapter {
    pub const fn new(missing_base_url: &'static str) -> Self {
        Self { missing_base_url }
    }

    fn base_url(&self, provider: &ProviderDescriptor) -> Result<String> {
        match provider.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => validate_base_url(url),
            _ => Err(DifftideError::Configuration(
                self.missing_base_url.to_string(),
            )),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn create_model(&self, provider: &ProviderDescriptor, model_id: &str) -> Result<ModelHandle> {
        let base_url = self.base_url(provider)?;
        Ok(Box::new(OpenAiTransport::new(
            provider.name.clone(),
            model_id,
            provider.api_key.clone(),
            base_url,
        )))
    }

    async fn fetch_models(&self, provider: &ProviderDescriptor) -> Result<Vec<ModelDescriptor>> {
        let base_url = self.base_url(provider)?;
        fetch_openai_models(&base_url, &provider.api_key).await
    }
}
