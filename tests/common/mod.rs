//! Shared test helpers and mock transport.

use async_trait::async_trait;
use futures::StreamExt;

use difftide::error::{DifftideError, Result};
use difftide::provider::{FragmentStream, ModelTransport, StreamFragment};

/// A mock transport that replays queued fragments and a canned
/// full-text fallback.
#[derive(Debug)]
pub struct MockTransport {
    model_id: String,
    fragments: std::sync::Mutex<Vec<StreamFragment>>,
    full_text: std::sync::Mutex<Option<String>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            fragments: std::sync::Mutex::new(Vec::new()),
            full_text: std::sync::Mutex::new(None),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queue a text fragment for the next streaming call.
    pub fn queue_text(&self, text: &str) {
        self.fragments
            .lock()
            .unwrap()
            .push(StreamFragment::Text(text.to_string()));
    }

    /// Queue a stream-level error fragment.
    pub fn queue_error(&self, message: &str) {
        self.fragments
            .lock()
            .unwrap()
            .push(StreamFragment::Error(DifftideError::Stream(
                message.to_string(),
            )));
    }

    /// Set the text returned by the blocking fallback call.
    pub fn set_full_text(&self, text: &str) {
        *self.full_text.lock().unwrap() = Some(text.to_string());
    }

    /// Prompts seen by either call, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for MockTransport {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.full_text.lock().unwrap().clone().unwrap_or_default())
    }

    async fn stream_text(&self, prompt: &str) -> Result<FragmentStream> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let fragments: Vec<StreamFragment> =
            std::mem::take(&mut *self.fragments.lock().unwrap());
        Ok(futures::stream::iter(fragments).boxed())
    }
}
