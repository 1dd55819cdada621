//! Input validation helpers
//!
//! Request DTOs derive [`validator::Validate`]. Handlers take [`ValidJson`] /
//! [`ValidQuery`] so malformed or invalid input is rejected with
//! `VALIDATION_FAILED` before anything reaches the workflow.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::Json;
use http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::utils::AppError;

/// JSON body that has been deserialized and validated
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        validate_payload(&value)?;
        Ok(Self(value))
    }
}

/// Query string that has been deserialized and validated
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        validate_payload(&value)?;
        Ok(Self(value))
    }
}

/// Optional JSON body: empty means `T::default()`
pub fn parse_optional_body<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?;
    validate_payload(&value)?;
    Ok(value)
}

/// Validate a payload, mapping failures to `VALIDATION_FAILED` with per-field details
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(validation_error)
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut err = AppError::validation("Request validation failed");
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        err = err.with_detail(field.to_string(), json!(messages));
    }
    err
}
