use crate::error::FlowError;
use crate::schema::Schema;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use service_core::error::AppError;
use validator::{Validate, ValidationErrors};

/// JSON body extractor whose rejections render as [`AppError`].
///
/// A body sent without a JSON content type is not parsed and reads as an
/// empty object, so the field checks answer with their usual 400.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => {
                let value = serde_json::from_value(Value::Object(Map::new()))
                    .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;
                Ok(JsonBody(value))
            }
            Err(rejection) => Err(rejection.into()),
        }
    }
}

/// Boundary checks for an inbound body, in order: presence of `required`,
/// shape, then format rules.
pub fn parse_request<T>(body: &Value, required: &str) -> Result<T, FlowError>
where
    T: Schema + DeserializeOwned + Validate,
{
    if !is_present(body.get(required)) {
        return Err(FlowError::Validation(format!(
            "Missing {} in request body",
            required
        )));
    }

    let request: T = T::shape()
        .parse(body)
        .map_err(FlowError::SchemaValidation)?;

    request
        .validate()
        .map_err(|e| FlowError::Validation(first_message(&e)))?;

    Ok(request)
}

/// Absent, `null`, `false`, `0` and `""` all count as missing.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .into_values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
