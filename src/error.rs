use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API error variants surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    Database(#[from] sqlx::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Validation failure on a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(name.to_string(), message.into());
        Self::Validation(errors)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "database error"),
            Self::Internal(e) => tracing::error!(error = %e, "internal error"),
            _ => {}
        }
        let body = match &self {
            Self::Validation(errors) => serde_json::json!({
                "kind": self.kind(),
                "errors": errors,
            }),
            _ => serde_json::json!({
                "kind": self.kind(),
                "message": self.to_string(),
            }),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_maps_to_401() {
        let resp = ApiError::AuthenticationRequired.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "AUTHENTICATION_REQUIRED");
    }

    #[tokio::test]
    async fn validation_carries_field_detail() {
        let resp = ApiError::field("email", "must not be empty").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "VALIDATION_FAILED");
        assert_eq!(json["errors"]["email"], "must not be empty");
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let resp = ApiError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn internal_hides_the_cause() {
        let resp = ApiError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "INTERNAL");
        assert_eq!(json["message"], "internal error");
    }
}
