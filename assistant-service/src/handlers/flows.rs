use crate::dtos::{
    ConversationRequest, ConversationResponse, ImageAnalysisRequest, ImageAnalysisResponse,
    SummarizationRequest, SummarizationResponse,
};
use crate::error::FlowError;
use crate::startup::AppState;
use crate::utils::{parse_request, JsonBody};
use axum::{extract::State, Json};
use serde_json::Value;

pub async fn chat(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<ConversationResponse>, FlowError> {
    let request: ConversationRequest = parse_request(&body, "query")
        .inspect_err(|e| tracing::warn!(route = "/api/chat", error = %e, "Rejected request"))?;

    let output = state.flows.conversation.run(request).await?;
    Ok(Json(output))
}

pub async fn analyze_image(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<ImageAnalysisResponse>, FlowError> {
    let request: ImageAnalysisRequest = parse_request(&body, "photoDataUri").inspect_err(|e| {
        tracing::warn!(route = "/api/analyze-image", error = %e, "Rejected request")
    })?;

    let output = state.flows.image_analysis.run(request).await?;
    Ok(Json(output))
}

pub async fn summarize_article(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<SummarizationResponse>, FlowError> {
    let request: SummarizationRequest = parse_request(&body, "article").inspect_err(|e| {
        tracing::warn!(route = "/api/summarize-article", error = %e, "Rejected request")
    })?;

    let output = state.flows.summarization.run(request).await?;
    Ok(Json(output))
}
