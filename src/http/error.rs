//! Action boundary: every handler failure becomes `{ "success": false, "error": ... }`.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::ShopError;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug)]
pub struct ApiError {
    error: ShopError,
    /// Shown instead of the error when its message is not meant for users.
    fallback: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.error {
            ShopError::Validation(_) | ShopError::EmptyCart => StatusCode::BAD_REQUEST,
            ShopError::InvalidCredentials | ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden => StatusCode::FORBIDDEN,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::DuplicateUser | ShopError::Constraint(_) => StatusCode::CONFLICT,
            ShopError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ShopError::Store(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(error: ShopError) -> Self { Self { error, fallback: GENERIC_FAILURE } }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ShopError::Validation(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.error.is_user_facing() {
            self.error.to_string()
        } else {
            tracing::error!(error = %self.error, "request failed");
            self.fallback.to_string()
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Attaches the action's own failure message to a service result.
pub trait OrSay<T> {
    fn or_say(self, fallback: &'static str) -> Result<T, ApiError>;
}

impl<T> OrSay<T> for crate::Result<T> {
    fn or_say(self, fallback: &'static str) -> Result<T, ApiError> {
        self.map_err(|error| ApiError { error, fallback })
    }
}

/// `axum::Json` whose rejections use the action error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

/// `{ "success": true, ...data }`; `data` must serialize as a map.
pub fn ok<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success { success: true, data })
}

pub fn done() -> Json<serde_json::Value> {
    Json(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(ShopError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(ShopError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(ShopError::DuplicateUser).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(ShopError::Gateway(GatewayError::NotConfigured)).status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_store_errors_are_masked() {
        let err = Err::<(), _>(ShopError::Store("relation \"cart\" does not exist".into()))
            .or_say("Failed to add item to cart")
            .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "success": false, "error": "Failed to add item to cart" }));
    }

    #[test]
    fn test_success_flattens() {
        let value = serde_json::to_value(ok(json!({ "orderId": "x" })).0).unwrap();
        assert_eq!(value, json!({ "success": true, "orderId": "x" }));
    }
}
