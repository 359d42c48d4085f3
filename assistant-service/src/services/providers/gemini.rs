//! Gemini AI provider implementation.
//!
//! Implements structured text generation using Google's Gemini REST API.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use crate::config::ModelSettings;
use crate::prompts::{PromptPart, RenderedPrompt};
use crate::schema::FieldIssue;
use crate::services::metrics;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

const BAD_REQUEST_DETAIL_TYPE: &str = "type.googleapis.com/google.rpc.BadRequest";

/// Gemini text provider.
pub struct GeminiTextProvider {
    settings: ModelSettings,
    client: Client,
}

impl GeminiTextProvider {
    /// No request timeout is set: a hung call holds its request until the
    /// transport gives up.
    pub fn new(settings: ModelSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            GEMINI_API_BASE, self.settings.model, method
        )
    }

    fn build_request(prompt: &RenderedPrompt, params: &GenerationParams) -> GenerateContentRequest {
        let parts = prompt.parts.iter().map(ContentPart::from_prompt_part).collect();

        let generation_config = params.output_schema.as_ref().map(|schema| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema.clone()),
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }

    async fn send(&self, request: &GenerateContentRequest) -> Result<ProviderResponse, ProviderError> {
        let mut builder = self.client.post(self.api_url("generateContent")).json(request);
        if let Some(key) = self.settings.api_key.api_key() {
            builder = builder.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &error_text));
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::Api {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        parse_response(api_response)
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = Self::build_request(prompt, params);

        tracing::debug!(
            model = %self.settings.model,
            prompt_len = prompt.text().len(),
            media_count = prompt.media_count(),
            "Sending request to Gemini API"
        );

        let start = Instant::now();
        let result = self.send(&request).await;
        metrics::record_provider_call(&self.settings.model, start.elapsed(), &result);

        result
    }
}

/// Map a non-2xx reply onto a provider error.
fn error_from_status(status: u16, body: &str) -> ProviderError {
    if status == 429 {
        return ProviderError::RateLimited;
    }

    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();

    if status == 400 {
        let violations: Vec<FieldIssue> = envelope
            .iter()
            .flat_map(|e| e.error.details.iter())
            .filter(|d| d.type_url.as_deref() == Some(BAD_REQUEST_DETAIL_TYPE))
            .flat_map(|d| d.field_violations.iter())
            .map(|v| FieldIssue::new(v.field.clone(), v.description.clone()))
            .collect();

        if !violations.is_empty() {
            return ProviderError::FieldViolations(violations);
        }
    }

    let message = envelope
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    ProviderError::Api { status, message }
}

fn parse_response(api_response: GenerateContentResponse) -> Result<ProviderResponse, ProviderError> {
    if api_response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_ref())
        .is_some()
    {
        return Err(ProviderError::ContentFiltered);
    }

    let candidate = api_response
        .candidates
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    let finish_reason = FinishReason::from_api(candidate.finish_reason.as_deref());
    if finish_reason == FinishReason::ContentFilter {
        return Err(ProviderError::ContentFiltered);
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| match p {
            ContentPart::Text { text } => Some(text),
            _ => None,
        })
        .collect();

    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let usage = api_response.usage_metadata.unwrap_or_default();

    Ok(ProviderResponse {
        text,
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
        finish_reason,
    })
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and payload.
fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    Some((mime_type, data))
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

impl ContentPart {
    fn from_prompt_part(part: &PromptPart) -> Self {
        match part {
            PromptPart::Text(text) => ContentPart::Text { text: text.clone() },
            PromptPart::Media { url } => match split_data_uri(url) {
                Some((mime_type, data)) => ContentPart::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: data.to_string(),
                    },
                },
                None => ContentPart::FileData {
                    file_data: FileData {
                        file_uri: url.clone(),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorDetail {
    #[serde(rename = "@type")]
    type_url: Option<String>,
    #[serde(default)]
    field_violations: Vec<FieldViolation>,
}

#[derive(Debug, Deserialize)]
struct FieldViolation {
    #[serde(default)]
    field: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_uri_media_becomes_inline_data() {
        let prompt = RenderedPrompt {
            parts: vec![
                PromptPart::Text("Describe this.".to_string()),
                PromptPart::Media {
                    url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
                },
            ],
        };
        let params = GenerationParams {
            output_schema: Some(json!({ "type": "OBJECT" })),
        };

        let request = GeminiTextProvider::build_request(&prompt, &params);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Describe this.");
        assert_eq!(
            body["contents"][0]["parts"][1]["inlineData"],
            json!({ "mimeType": "image/png", "data": "iVBORw0KGgo=" })
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn remote_media_becomes_file_data() {
        let part = ContentPart::from_prompt_part(&PromptPart::Media {
            url: "gs://bucket/cat.png".to_string(),
        });
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["fileData"]["fileUri"], "gs://bucket/cat.png");
    }

    #[test]
    fn concatenates_candidate_text_parts() {
        let api_response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "{\"summary\":" },
                    { "text": "\"short\"}" }
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 4 }
        }))
        .unwrap();

        let response = parse_response(api_response).unwrap();
        assert_eq!(response.text, "{\"summary\":\"short\"}");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 4);
        assert_eq!(response.finish_reason, FinishReason::Complete);
    }

    #[test]
    fn max_tokens_stop_keeps_partial_text() {
        let api_response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"summary\": \"cut" }] },
                "finishReason": "MAX_TOKENS"
            }]
        }))
        .unwrap();

        let response = parse_response(api_response).unwrap();
        assert_eq!(response.finish_reason, FinishReason::Length);
        assert_eq!(response.text, "{\"summary\": \"cut");
    }

    #[test]
    fn safety_stop_is_content_filtered() {
        let api_response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        assert!(matches!(
            parse_response(api_response),
            Err(ProviderError::ContentFiltered)
        ));
    }

    #[test]
    fn blocked_prompt_is_content_filtered() {
        let api_response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        assert!(matches!(
            parse_response(api_response),
            Err(ProviderError::ContentFiltered)
        ));
    }

    #[test]
    fn no_candidates_is_empty_response() {
        let api_response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            parse_response(api_response),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn bad_request_with_field_violations() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "Invalid JSON payload received.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.BadRequest",
                    "fieldViolations": [{
                        "field": "contents[0].parts[1].inline_data",
                        "description": "Invalid base64 data"
                    }]
                }]
            }
        })
        .to_string();

        match error_from_status(400, &body) {
            ProviderError::FieldViolations(issues) => assert_eq!(
                issues,
                vec![FieldIssue::new(
                    "contents[0].parts[1].inline_data",
                    "Invalid base64 data"
                )]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_uses_provider_message() {
        let body = json!({
            "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
        })
        .to_string();

        match error_from_status(403, &body) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert!(matches!(
            error_from_status(429, "quota"),
            ProviderError::RateLimited
        ));
    }

    #[test]
    fn unparseable_error_body_is_kept_verbatim() {
        match error_from_status(502, "upstream connect error") {
            ProviderError::Api { message, .. } => assert_eq!(message, "upstream connect error"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn splits_data_uri() {
        assert_eq!(
            split_data_uri("data:image/jpeg;base64,/9j/4AAQ"),
            Some(("image/jpeg", "/9j/4AAQ"))
        );
        assert_eq!(split_data_uri("https://example.com/a.png"), None);
    }
}
