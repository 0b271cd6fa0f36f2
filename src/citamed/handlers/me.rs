//! Authenticated profile endpoint. The store, not the token, is the source
//! of truth for current profile data.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::token;
use crate::citamed::error::ApiError;
use crate::citamed::handlers::bearer_token;
use crate::cli::globals::GlobalArgs;
use crate::users::{PgUsers, UserProfile};

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserProfile),
        (status = 401, description = "Missing, malformed or expired token"),
        (status = 404, description = "Token subject no longer exists"),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
#[instrument(skip(headers, users, globals))]
pub async fn me(
    headers: HeaderMap,
    users: Extension<PgUsers>,
    globals: Extension<GlobalArgs>,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?;

    // Verification failures all collapse into one message.
    let claims = token::verify(
        token,
        globals.jwt_secret.expose_secret(),
        globals.token_max_age_seconds,
    )
    .map_err(|_| ApiError::Auth("Token inválido o expirado"))?;

    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Auth("Token inválido o expirado"))?;

    let user = users
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("No encontrado"))?;

    Ok(Json(json!({ "user": UserProfile::from(user) })))
}
