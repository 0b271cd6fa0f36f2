//! OTP-gated login.
//!
//! The OTP is checked before the credential store is touched, so a bad code
//! fails fast and carries no signal about whether the account exists. User
//! absence and password mismatch share one generic 401.

use axum::{extract::Extension, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::auth::{password, token};
use crate::citamed::error::{ApiError, FieldError};
use crate::citamed::handlers::{normalize_email, valid_email, valid_otp_code};
use crate::cli::globals::GlobalArgs;
use crate::otp::{OtpPurpose, PgOtpLedger};
use crate::users::{PgUsers, UserProfile};

use super::user_register::{PASSWORD_MAX, PASSWORD_MIN};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    email: String,
    password: String,
    #[serde(rename = "otpCode")]
    otp_code: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<String, ApiError> {
        let mut errors = Vec::new();

        let email = normalize_email(&self.email);
        if !valid_email(&email) {
            errors.push(FieldError::new("email", "Correo electrónico inválido"));
        }

        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&self.password.len()) {
            errors.push(FieldError::new(
                "password",
                "La contraseña debe tener entre 8 y 72 caracteres",
            ));
        }

        if !valid_otp_code(&self.otp_code) {
            errors.push(FieldError::new("otpCode", "El código debe tener 6 dígitos"));
        }

        if errors.is_empty() {
            Ok(email)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token and public profile"),
        (status = 400, description = "Validation failure or invalid OTP"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
#[instrument(skip(ledger, users, globals, payload))]
pub async fn login(
    ledger: Extension<PgOtpLedger>,
    users: Extension<PgUsers>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.ok_or_else(ApiError::missing_payload)?.0;
    let email = request.validate()?;

    // OTP first: no user lookup, no password comparison until it passes.
    let verification = ledger
        .verify(&email, &request.otp_code, OtpPurpose::Login)
        .await?;
    if !verification.valid {
        return Err(ApiError::BadRequest("Código inválido o expirado"));
    }

    let user = users
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::Auth("Credenciales inválidas"))?;

    if !password::verify_password(&request.password, &user.password_hash)? {
        return Err(ApiError::Auth("Credenciales inválidas"));
    }

    let token = token::issue(
        &user,
        globals.jwt_secret.expose_secret(),
        globals.token_ttl_days,
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    debug!(user_id = %user.id, "login successful");

    Ok(Json(json!({
        "token": token,
        "user": UserProfile::from(user),
    })))
}
