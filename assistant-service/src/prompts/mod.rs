//! Prompt templates bound to typed input and output records.
//!
//! A template is rendered with Tera (autoescape off) from the serialized
//! input record. Media fields are not rendered into the text; their values
//! are attached as separate media parts after it.

pub mod templates;

use crate::error::FlowError;
use crate::schema::Schema;
use crate::services::providers::{FinishReason, GenerationParams, TextProvider};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use tera::{Context, Tera};

/// One piece of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    /// Inline media reference, typically a `data:` URI.
    Media { url: String },
}

/// Exact content submitted to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub parts: Vec<PromptPart>,
}

impl RenderedPrompt {
    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::Media { .. } => None,
            })
            .collect()
    }

    pub fn media_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, PromptPart::Media { .. }))
            .count()
    }
}

pub struct PromptTemplate<I, O> {
    name: &'static str,
    tera: Tera,
    media_fields: &'static [&'static str],
    constants: Vec<(&'static str, String)>,
    _records: PhantomData<fn(&I) -> O>,
}

impl<I, O> PromptTemplate<I, O>
where
    I: Schema + Serialize,
    O: Schema + DeserializeOwned,
{
    /// Compile `text` under `name`. Fails on template syntax errors.
    pub fn new(
        name: &'static str,
        text: &str,
        media_fields: &'static [&'static str],
    ) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(name, text)?;

        Ok(Self {
            name,
            tera,
            media_fields,
            constants: Vec::new(),
            _records: PhantomData,
        })
    }

    /// Bind a fixed value available to the template as `{{ key }}`.
    pub fn with_constant(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.constants.push((key, value.into()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Substitute the input record's fields into the template.
    pub fn render(&self, input: &I) -> Result<RenderedPrompt, FlowError> {
        let value = serde_json::to_value(input)
            .map_err(|e| FlowError::ModelInvocation(format!("{}: {}", self.name, e)))?;

        let mut context = Context::from_value(value.clone())
            .map_err(|e| FlowError::ModelInvocation(format!("{}: {}", self.name, e)))?;
        for (key, constant) in &self.constants {
            context.insert(*key, constant);
        }

        let text = self
            .tera
            .render(self.name, &context)
            .map_err(|e| FlowError::ModelInvocation(format!("{}: {}", self.name, e)))?;

        let mut parts = vec![PromptPart::Text(text)];
        parts.extend(self.media_fields.iter().filter_map(|field| {
            value
                .get(*field)
                .and_then(Value::as_str)
                .map(|url| PromptPart::Media {
                    url: url.to_string(),
                })
        }));

        Ok(RenderedPrompt { parts })
    }

    /// Render, call the model once, and check the reply against `O`'s shape.
    pub async fn invoke(&self, provider: &dyn TextProvider, input: &I) -> Result<O, FlowError> {
        let prompt = self.render(input)?;
        let params = GenerationParams {
            output_schema: Some(O::shape().to_response_schema()),
        };

        let response = provider.generate(&prompt, &params).await?;
        if response.finish_reason == FinishReason::Length {
            tracing::warn!(
                prompt = self.name,
                output_tokens = response.output_tokens,
                "Model reply stopped at the token limit"
            );
        }
        let value = parse_model_output(&response.text)?;

        O::shape().parse(&value).map_err(FlowError::SchemaValidation)
    }
}

/// Parse the model's JSON reply, tolerating a surrounding Markdown fence.
fn parse_model_output(text: &str) -> Result<Value, FlowError> {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(fenced) => {
            let inner = fenced.strip_suffix("```").unwrap_or(fenced);
            match inner.split_once('\n') {
                Some((_, rest)) => rest.trim(),
                // Single-line fence: skip the language tag up to the JSON.
                None => inner
                    .find(|c: char| c == '{' || c == '[')
                    .map_or(inner, |start| &inner[start..])
                    .trim(),
            }
        }
        None => trimmed,
    };

    serde_json::from_str(body)
        .map_err(|e| FlowError::ModelInvocation(format!("Model returned invalid JSON: {}", e)))
}
