//! Request-boundary error taxonomy.
//!
//! Protocol steps return these variants; mapping to HTTP happens here and
//! nowhere else. Authentication failures carry generic messages so the
//! response never reveals which factor failed or whether an account exists.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// One field-scoped validation failure. Validation detail is not
/// security-sensitive, unlike auth failures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Datos inválidos")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    Auth(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Error interno")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 400 for a missing or undecodable JSON body.
    #[must_use]
    pub fn missing_payload() -> Self {
        Self::Validation(vec![FieldError::new(
            "body",
            "Cuerpo de la petición ausente o inválido",
        )])
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Validation(errors) => serde_json::json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            Self::Internal(err) => {
                // Detail stays server-side, the client sees a generic message.
                error!("internal error: {err:?}");
                serde_json::json!({ "message": self.to_string() })
            }
            _ => serde_json::json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn response_parts(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_field_errors() {
        let error = ApiError::Validation(vec![FieldError::new("email", "Correo inválido")]);
        let (status, body) = response_parts(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Datos inválidos");
        assert_eq!(body["errors"][0]["field"], "email");
        assert_eq!(body["errors"][0]["message"], "Correo inválido");
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) = response_parts(ApiError::Conflict("Correo o usuario ya registrado")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Correo o usuario ya registrado");
    }

    #[tokio::test]
    async fn auth_maps_to_401() {
        let (status, body) = response_parts(ApiError::Auth("Credenciales inválidas")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Credenciales inválidas");
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, _) = response_parts(ApiError::NotFound("No encontrado")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, body) =
            response_parts(ApiError::Internal(anyhow::anyhow!("connection refused"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error interno");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn auth_failures_share_a_shape() {
        // User-absent and password-mismatch responses must be structurally
        // indistinguishable.
        let (s1, b1) = response_parts(ApiError::Auth("Credenciales inválidas")).await;
        let (s2, b2) = response_parts(ApiError::Auth("Credenciales inválidas")).await;
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
    }
}
