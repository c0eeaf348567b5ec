//! OpenAI Chat Completions transport and adapter.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::error::{DifftideError, Result};
use crate::registry::{ModelDescriptor, ProviderDescriptor};

use super::http::{bearer_headers, parse_sse_data, shared_client};
use super::{
    validate_base_url, FragmentStream, ModelHandle, ModelTransport, ProviderAdapter,
    StreamFragment,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Transport for any chat-completions endpoint speaking the OpenAI wire
/// format. Azure, Anthropic and Gemini providers reuse it when configured
/// with a compatible proxy base URL.
#[derive(Debug)]
pub struct OpenAiTransport {
    provider_name: String,
    model_id: String,
    api_key: String,
    base_url: String,
}

impl OpenAiTransport {
    pub fn new(
        provider_name: impl Into<String>,
        model_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            model_id: model_id.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn request_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model_id,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": stream,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ModelTransport for OpenAiTransport {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model_id, "chat completion (blocking)");

        let resp = shared_client()
            .post(self.completions_url())
            .headers(bearer_headers(&self.api_key))
            .json(&self.request_body(prompt, false))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(DifftideError::api(status, body));
        }

        let data: ChatResponse = resp.json().await?;
        Ok(data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn stream_text(&self, prompt: &str) -> Result<FragmentStream> {
        debug!(model = %self.model_id, "chat completion (streaming)");

        let resp = shared_client()
            .post(self.completions_url())
            .headers(bearer_headers(&self.api_key))
            .json(&self.request_body(prompt, true))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(DifftideError::api(status, body));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield StreamFragment::Error(DifftideError::Network(e));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = parse_sse_data(&line) {
                        match serde_json::from_str::<StreamChunk>(data) {
                            Ok(chunk) => {
                                let text = chunk
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content)
                                    .unwrap_or_default();
                                if !text.is_empty() {
                                    yield StreamFragment::Text(text);
                                }
                            }
                            Err(_) => {} // skip unparseable chunks
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Adapter for the `openai` provider type. The base URL is optional and
/// defaults to the public OpenAI endpoint.
pub struct OpenAiAdapter;

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn create_model(&self, provider: &ProviderDescriptor, model_id: &str) -> Result<ModelHandle> {
        let base_url = match provider.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => validate_base_url(url)?,
            _ => DEFAULT_BASE_URL.to_string(),
        };
        Ok(Box::new(OpenAiTransport::new(
            provider.name.clone(),
            model_id,
            provider.api_key.clone(),
            base_url,
        )))
    }

    async fn fetch_models(&self, provider: &ProviderDescriptor) -> Result<Vec<ModelDescriptor>> {
        let base_url = match provider.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => validate_base_url(url)?,
            _ => DEFAULT_BASE_URL.to_string(),
        };
        fetch_openai_models(&base_url, &provider.api_key).await
    }
}

/// GET `{base_url}/models` and map the OpenAI-style envelope.
///
/// A missing `data` array is a malformed envelope, not an empty catalog;
/// the raw body is carried in the error for diagnosis.
pub(crate) async fn fetch_openai_models(
    base_url: &str,
    api_key: &str,
) -> Result<Vec<ModelDescriptor>> {
    let url = format!("{}/models", base_url.trim_end_matches('/'));

    let resp = shared_client()
        .get(&url)
        .headers(bearer_headers(api_key))
        .send()
        .await?;

    let status = resp.status().as_u16();
    let body = resp.text().await?;
    if status != 200 {
        return Err(DifftideError::api(status, body));
    }

    let envelope: ModelsEnvelope = serde_json::from_str(&body)?;
    let data = envelope.data.ok_or_else(|| {
        DifftideError::api(status, format!("missing `data` array in models response: {body}"))
    })?;

    Ok(data
        .into_iter()
        .map(|m| {
            let name = m.name.unwrap_or_else(|| m.id.clone());
            ModelDescriptor {
                id: m.id,
                name: Some(name),
                group: m.group,
            }
        })
        .collect())
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Envelope returned by `/models`. Some providers (OpenRouter) include
/// `name`/`group` next to the id.
#[derive(Deserialize)]
struct ModelsEnvelope {
    data: Option<Vec<RemoteModel>>,
}

#[derive(Deserialize)]
struct RemoteModel {
    id: String,
    name: Option<String>,
    group: Option<String>,
}
