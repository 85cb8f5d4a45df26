use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde_json::Value;

use rustchain_core::error::RcError;

use crate::error::ApiError;

/// Parses the request body as JSON and requires the root to be an object —
/// every handler taking a body goes through this instead of `axum::Json` so
/// a malformed or non-object body always comes back as
/// `400 INVALID_JSON_OBJECT` rather than axum's default rejection shape.
/// An empty body is treated as `{}`.
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError(RcError::InvalidJsonObject))?;
        if bytes.is_empty() {
            return Ok(JsonBody(Value::Object(Default::default())));
        }
        let value: Value = serde_json::from_slice(&bytes).map_err(|_| ApiError(RcError::InvalidJsonObject))?;
        if !value.is_object() {
            return Err(ApiError(RcError::InvalidJsonObject));
        }
        Ok(JsonBody(value))
    }
}
