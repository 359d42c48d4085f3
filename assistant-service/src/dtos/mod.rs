//! Request and response records for the three flows.

use crate::schema::{FieldSpec, Schema, Shape};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const DATA_URI_IMAGE_PREFIX: &str = "data:image/";
pub const DATA_URI_BASE64_MARKER: &str = ";base64,";
pub const INVALID_DATA_URI_MESSAGE: &str =
    "Invalid photoDataUri format. Expected data:image/...;base64,...";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    #[validate(length(min = 1, message = "Missing query in request body"))]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRequest {
    #[validate(custom(function = "validate_image_data_uri"))]
    pub photo_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResponse {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SummarizationRequest {
    #[validate(length(min = 1, message = "Missing article in request body"))]
    pub article: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizationResponse {
    pub summary: String,
}

/// Only the prefix and the base64 marker are checked; size is bounded by the
/// HTTP body limit.
fn validate_image_data_uri(uri: &str) -> Result<(), ValidationError> {
    if uri.starts_with(DATA_URI_IMAGE_PREFIX) && uri.contains(DATA_URI_BASE64_MARKER) {
        return Ok(());
    }

    let mut err = ValidationError::new("image_data_uri");
    err.message = Some(Cow::Borrowed(INVALID_DATA_URI_MESSAGE));
    Err(err)
}

static CONVERSATION_REQUEST: Shape = Shape {
    name: "ConversationRequest",
    fields: &[FieldSpec {
        name: "query",
        description: "The user query.",
    }],
};

static CONVERSATION_RESPONSE: Shape = Shape {
    name: "ConversationResponse",
    fields: &[FieldSpec {
        name: "response",
        description: "The response from the AI.",
    }],
};

static IMAGE_ANALYSIS_REQUEST: Shape = Shape {
    name: "ImageAnalysisRequest",
    fields: &[FieldSpec {
        name: "photoDataUri",
        description: "A photo, as a data URI that must include a MIME type and use Base64 \
                      encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
    }],
};

static IMAGE_ANALYSIS_RESPONSE: Shape = Shape {
    name: "ImageAnalysisResponse",
    fields: &[FieldSpec {
        name: "description",
        description: "A description of the image content.",
    }],
};

static SUMMARIZATION_REQUEST: Shape = Shape {
    name: "SummarizationRequest",
    fields: &[FieldSpec {
        name: "article",
        description: "The article to summarize.",
    }],
};

static SUMMARIZATION_RESPONSE: Shape = Shape {
    name: "SummarizationResponse",
    fields: &[FieldSpec {
        name: "summary",
        description: "A concise summary of the article.",
    }],
};

impl Schema for ConversationRequest {
    fn shape() -> &'static Shape {
        &CONVERSATION_REQUEST
    }
}

impl Schema for ConversationResponse {
    fn shape() -> &'static Shape {
        &CONVERSATION_RESPONSE
    }
}

impl Schema for ImageAnalysisRequest {
    fn shape() -> &'static Shape {
        &IMAGE_ANALYSIS_REQUEST
    }
}

impl Schema for ImageAnalysisResponse {
    fn shape() -> &'static Shape {
        &IMAGE_ANALYSIS_RESPONSE
    }
}

impl Schema for SummarizationRequest {
    fn shape() -> &'static Shape {
        &SUMMARIZATION_REQUEST
    }
}

impl Schema for SummarizationResponse {
    fn shape() -> &'static Shape {
        &SUMMARIZATION_RESPONSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image(uri: &str) -> ImageAnalysisRequest {
        ImageAnalysisRequest {
            photo_data_uri: uri.to_string(),
        }
    }

    #[test]
    fn accepts_base64_image_data_uri() {
        assert!(image("data:image/png;base64,iVBORw0KGgo=").validate().is_ok());
    }

    #[test]
    fn rejects_non_image_or_non_base64_uri() {
        for uri in [
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,rawbytes",
            "https://example.com/cat.png",
        ] {
            let errors = image(uri).validate().unwrap_err();
            let message = errors
                .field_errors()
                .into_values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()));
            assert_eq!(message.as_deref(), Some(INVALID_DATA_URI_MESSAGE), "{uri}");
        }
    }

    #[test]
    fn image_request_uses_camel_case_on_the_wire() {
        let value = json!({ "photoDataUri": "data:image/jpeg;base64,AAAA" });
        let parsed: ImageAnalysisRequest = ImageAnalysisRequest::shape().parse(&value).unwrap();
        assert_eq!(parsed.photo_data_uri, "data:image/jpeg;base64,AAAA");
    }

    fn wire_keys<T: Serialize>(record: &T) -> Vec<String> {
        match serde_json::to_value(record).unwrap() {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("expected object, got {other}"),
        }
    }

    fn shape_keys<T: Schema>() -> Vec<String> {
        T::shape().fields.iter().map(|f| f.name.to_string()).collect()
    }

    #[test]
    fn every_record_serializes_to_its_shape() {
        let text = || "x".to_string();

        assert_eq!(
            wire_keys(&ConversationRequest { query: text() }),
            shape_keys::<ConversationRequest>()
        );
        assert_eq!(
            wire_keys(&ConversationResponse { response: text() }),
            shape_keys::<ConversationResponse>()
        );
        assert_eq!(
            wire_keys(&image("data:image/png;base64,AAAA")),
            shape_keys::<ImageAnalysisRequest>()
        );
        assert_eq!(
            wire_keys(&ImageAnalysisResponse {
                description: text()
            }),
            shape_keys::<ImageAnalysisResponse>()
        );
        assert_eq!(
            wire_keys(&SummarizationRequest { article: text() }),
            shape_keys::<SummarizationRequest>()
        );
        assert_eq!(
            wire_keys(&SummarizationResponse { summary: text() }),
            shape_keys::<SummarizationResponse>()
        );
    }
}
