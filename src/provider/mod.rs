//! Provider adapters and model transports.
//!
//! Each provider type registers one [`ProviderAdapter`] in a table keyed
//! by [`ProviderKind`]; the generation pipeline only ever sees the
//! [`ModelTransport`] handle an adapter hands back, so provider quirks
//! (auth header vs. query-string key, response envelope shapes) stay
//! isolated here.

pub mod gemini;
pub mod http;
pub mod openai;
pub mod openai_compatible;

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{DifftideError, Result};
use crate::registry::{ModelDescriptor, ProviderDescriptor, ProviderKind};

/// One unit of a streamed completion: incremental text or a stream-level
/// error. Arrival order is the only guarantee.
#[derive(Debug)]
pub enum StreamFragment {
    Text(String),
    Error(DifftideError),
}

/// Ordered fragment sequence produced by one streaming call.
pub type FragmentStream = BoxStream<'static, StreamFragment>;

/// Opaque handle bound to one (endpoint, credentials, model) triple.
///
/// Creation never performs network I/O; both calls below issue exactly
/// one HTTP request each.
#[async_trait]
pub trait ModelTransport: Send + Sync + std::fmt::Debug {
    fn provider_name(&self) -> &str;
    fn model_id(&self) -> &str;

    /// One blocking text completion, returning the full response text.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// One streaming text completion.
    async fn stream_text(&self, prompt: &str) -> Result<FragmentStream>;
}

pub type ModelHandle = Box<dyn ModelTransport>;

/// Capability set implemented per provider type.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Build a model handle for one generation call. Fails with a
    /// configuration error when a required base URL is missing or
    /// malformed; performs no network call.
    fn create_model(&self, provider: &ProviderDescriptor, model_id: &str) -> Result<ModelHandle>;

    /// Discover the models the remote endpoint offers (one HTTP GET).
    async fn fetch_models(&self, provider: &ProviderDescriptor) -> Result<Vec<ModelDescriptor>>;
}

fn adapters() -> &'static HashMap<ProviderKind, Box<dyn ProviderAdapter>> {
    static TABLE: OnceLock<HashMap<ProviderKind, Box<dyn ProviderAdapter>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: HashMap<ProviderKind, Box<dyn ProviderAdapter>> = HashMap::new();
        table.insert(ProviderKind::OpenAi, Box::new(openai::OpenAiAdapter));
        table.insert(
            ProviderKind::OpenAiCompatible,
            Box::new(openai_compatible::OpenAiCompatibleAdapter::new(
                "OpenAI-compatible provider requires a base URL.",
            )),
        );
        table.insert(
            ProviderKind::AzureOpenAi,
            Box::new(openai_compatible::OpenAiCompatibleAdapter::new(
                "Azure OpenAI native support not implemented. \
                 Provide your Azure endpoint as base_url.",
            )),
        );
        table.insert(
            ProviderKind::Anthropic,
            Box::new(openai_compatible::OpenAiCompatibleAdapter::new(
                "Anthropic native support not implemented. \
                 Use an OpenAI-compatible proxy and provide a base_url.",
            )),
        );
        table.insert(ProviderKind::Gemini, Box::new(gemini::GeminiAdapter));
        table
    })
}

/// Adapter registered for a provider type.
pub fn adapter_for(kind: ProviderKind) -> &'static dyn ProviderAdapter {
    // The table covers every ProviderKind variant.
    adapters()
        .get(&kind)
        .map(|a| a.as_ref())
        .unwrap_or_else(|| unreachable!("no adapter registered for {kind}"))
}

/// Build a model handle for `provider` + `model_id`.
pub fn create_model(provider: &ProviderDescriptor, model_id: &str) -> Result<ModelHandle> {
    tracing::debug!(
        provider = %provider.name,
        kind = %provider.kind,
        model = model_id,
        "creating model handle"
    );
    adapter_for(provider.kind).create_model(provider, model_id)
}

/// Discover the models `provider` offers remotely.
pub async fn fetch_models(provider: &ProviderDescriptor) -> Result<Vec<ModelDescriptor>> {
    adapter_for(provider.kind).fetch_models(provider).await
}

/// Validate and normalize a base URL (scheme check, trailing slash strip).
pub(crate) fn validate_base_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(DifftideError::Configuration(
            "Base URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(url.trim_end_matches('/').to_string())
}
