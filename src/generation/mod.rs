//! Streaming commit-message generation.
//!
//! One invocation runs the pipeline: resolve provider and model from the
//! configuration snapshot, compose the prompt, stream the completion
//! into the caller's sink, and return the final text. The stream is
//! always drained to completion before a captured stream error is
//! raised, so partial text already forwarded to the sink is never
//! retracted.

use std::path::PathBuf;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{DifftideError, Result};
use crate::prompt::PromptResolver;
use crate::provider::{self, ModelTransport, StreamFragment};
use crate::registry;

/// Language used when the configuration does not set one.
pub const DEFAULT_LANGUAGE: &str = "zh-CN";

/// Caller-supplied provider/model override; unset fields fall back to
/// the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub provider_id: Option<String>,
    pub model_id: Option<String>,
}

/// Generate one commit message from `diff`, forwarding text fragments
/// to `sink` as they arrive and returning the trimmed final message.
pub async fn generate_commit_message(
    settings: &Settings,
    roots: &[PathBuf],
    diff: &str,
    options: &GenerationOptions,
    mut sink: impl FnMut(&str),
    cancel: &CancellationToken,
) -> Result<String> {
    let language = settings.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);

    let provider = match options.provider_id.as_deref() {
        Some(id) => registry::find_provider(settings, id),
        None => registry::default_provider(settings),
    }
    .ok_or(DifftideError::NoProvider)?;

    let model_id = match options.model_id.clone() {
        Some(id) => id,
        None => registry::default_model(settings, &provider)
            .ok_or_else(|| DifftideError::NoModel(provider.name.clone()))?,
    };

    info!(
        provider = %provider.name,
        model = %model_id,
        language,
        "generating commit message"
    );

    let prompt = PromptResolver::new(settings, roots).compose(language, diff);
    let handle = provider::create_model(&provider, &model_id)?;

    stream_to_sink(handle.as_ref(), &prompt, &mut sink, cancel).await
}

/// Drive one streaming call against a transport.
///
/// Text fragments are appended to the accumulator and forwarded to the
/// sink in arrival order. An error fragment is parked in a pending slot
/// and the stream keeps draining; the first captured error wins and is
/// raised only after the stream ends. An empty stream with no error
/// triggers one blocking full-text fallback, forwarded to the sink once.
/// Once `cancel` fires, no further sink invocations are made.
pub async fn stream_to_sink(
    transport: &dyn ModelTransport,
    prompt: &str,
    sink: &mut dyn FnMut(&str),
    cancel: &CancellationToken,
) -> Result<String> {
    let mut stream = transport.stream_text(prompt).await?;

    let mut accumulated = String::new();
    let mut pending_error: Option<DifftideError> = None;

    loop {
        // biased: the cancellation check must win over a ready fragment.
        let fragment = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DifftideError::Cancelled),
            fragment = stream.next() => match fragment {
                Some(f) => f,
                None => break,
            },
        };

        match fragment {
            StreamFragment::Text(text) => {
                accumulated.push_str(&text);
                sink(&text);
            }
            StreamFragment::Error(e) => {
                warn!(error = %e, "stream error, draining before raising");
                if pending_error.is_none() {
                    pending_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = pending_error {
        return Err(e);
    }

    if accumulated.is_empty() {
        debug!("no text from stream, trying blocking completion");
        let full = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DifftideError::Cancelled),
            full = transport.generate_text(prompt) => full?,
        };
        if !full.is_empty() {
            sink(&full);
            accumulated = full;
        }
    }

    if accumulated.is_empty() {
        return Err(DifftideError::EmptyResponse);
    }

    Ok(accumulated.trim().to_string())
}
