use crate::schema::FieldIssue;
use crate::services::providers::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every way a flow request can fail. The router is the only place these
/// become HTTP statuses.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Required field missing or malformed at the HTTP boundary.
    #[error("{0}")]
    Validation(String),

    /// Request body or model output does not match its declared shape.
    #[error("Schema validation failed: {}", describe_issues(.0))]
    SchemaValidation(Vec<FieldIssue>),

    /// The model call failed, or its reply could not be used.
    #[error("{0}")]
    ModelInvocation(String),
}

impl From<ProviderError> for FlowError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::FieldViolations(issues) => FlowError::SchemaValidation(issues),
            other => FlowError::ModelInvocation(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldIssue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            FlowError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    details: None,
                    message: None,
                },
            ),
            FlowError::SchemaValidation(issues) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request body".to_string(),
                    details: Some(issues),
                    message: None,
                },
            ),
            FlowError::ModelInvocation(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: None,
                    message: Some(message),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}
