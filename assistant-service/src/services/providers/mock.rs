//! Mock provider implementation for testing.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use crate::prompts::RenderedPrompt;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Fill every field of the requested output schema with the rendered
    /// prompt text.
    Echo,
    /// Return this raw text verbatim.
    Reply(String),
    /// Fail with this error.
    Fail(ProviderError),
}

/// Mock text provider that counts its calls.
pub struct MockTextProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<RenderedPrompt>>,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<RenderedPrompt> {
        self.last_prompt.lock().ok().and_then(|guard| guard.clone())
    }
}

/// Build a JSON object with each declared output property set to `text`.
fn echo_reply(text: &str, params: &GenerationParams) -> String {
    let fields: Map<String, Value> = params
        .output_schema
        .as_ref()
        .and_then(|schema| schema.get("properties"))
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .keys()
                .map(|name| (name.clone(), Value::String(text.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Value::Object(fields).to_string()
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_prompt.lock() {
            *guard = Some(prompt.clone());
        }

        let prompt_text = prompt.text();
        let text = match &self.behavior {
            MockBehavior::Echo => echo_reply(&prompt_text, params),
            MockBehavior::Reply(text) => text.clone(),
            MockBehavior::Fail(err) => return Err(err.clone()),
        };

        Ok(ProviderResponse {
            input_tokens: prompt_text.len() as i32 / 4,
            output_tokens: text.len() as i32 / 4,
            text,
            finish_reason: FinishReason::Complete,
        })
    }
}
