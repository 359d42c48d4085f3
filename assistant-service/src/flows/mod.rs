//! Flow functions: one template invocation per request, no state.

use crate::dtos::{
    ConversationRequest, ConversationResponse, ImageAnalysisRequest, ImageAnalysisResponse,
    SummarizationRequest, SummarizationResponse,
};
use crate::error::FlowError;
use crate::prompts::{templates, PromptTemplate};
use crate::schema::Schema;
use crate::services::metrics;
use crate::services::providers::TextProvider;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A named pipeline from a typed request to a model-backed typed response.
pub struct Flow<I, O> {
    name: &'static str,
    template: PromptTemplate<I, O>,
    provider: Arc<dyn TextProvider>,
}

impl<I, O> Flow<I, O>
where
    I: Schema + Serialize + Send + Sync,
    O: Schema + DeserializeOwned + Send,
{
    pub fn new(
        name: &'static str,
        template: PromptTemplate<I, O>,
        provider: Arc<dyn TextProvider>,
    ) -> Self {
        Self {
            name,
            template,
            provider,
        }
    }

    pub async fn run(&self, input: I) -> Result<O, FlowError> {
        let start = Instant::now();
        let result = self.template.invoke(self.provider.as_ref(), &input).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    flow = self.name,
                    prompt = self.template.name(),
                    model = self.provider.model(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Flow completed"
                );
                metrics::record_flow(self.name, "ok", elapsed);
            }
            Err(e) => {
                tracing::error!(
                    flow = self.name,
                    prompt = self.template.name(),
                    model = self.provider.model(),
                    error = %e,
                    "Flow failed"
                );
                metrics::record_flow(self.name, "error", elapsed);
            }
        }

        result
    }
}

/// The three flows, sharing one provider handle.
pub struct Flows {
    pub conversation: Flow<ConversationRequest, ConversationResponse>,
    pub image_analysis: Flow<ImageAnalysisRequest, ImageAnalysisResponse>,
    pub summarization: Flow<SummarizationRequest, SummarizationResponse>,
}

impl Flows {
    pub fn new(provider: Arc<dyn TextProvider>, persona: &str) -> Result<Self, tera::Error> {
        Ok(Self {
            conversation: Flow::new(
                "startConversationFlow",
                templates::conversation(persona)?,
                provider.clone(),
            ),
            image_analysis: Flow::new(
                "analyzeImageFlow",
                templates::image_analysis()?,
                provider.clone(),
            ),
            summarization: Flow::new(
                "summarizeArticleFlow",
                templates::summarization()?,
                provider,
            ),
        })
    }
}
