//! Code issuance and verification endpoints.
//!
//! `request-otp` responds identically whether or not the email belongs to a
//! registered account; issuing a code must not be an account oracle.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::citamed::error::{ApiError, FieldError};
use crate::citamed::handlers::{normalize_email, valid_email, valid_otp_code};
use crate::mailer::Mailer;
use crate::otp::{OtpPurpose, PgOtpLedger};

#[derive(ToSchema, Deserialize, Debug)]
pub struct OtpRequest {
    email: String,
    purpose: String,
}

impl OtpRequest {
    fn validate(&self) -> Result<(String, OtpPurpose), ApiError> {
        let mut errors = Vec::new();

        let email = normalize_email(&self.email);
        if !valid_email(&email) {
            errors.push(FieldError::new("email", "Correo electrónico inválido"));
        }

        let purpose = OtpPurpose::parse(&self.purpose);
        if purpose.is_none() {
            errors.push(FieldError::new("purpose", "Propósito desconocido"));
        }

        match purpose {
            Some(purpose) if errors.is_empty() => Ok((email, purpose)),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/request-otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Code issued and handed to the mailer"),
        (status = 400, description = "Invalid email or purpose"),
        (status = 500, description = "Delivery failure"),
    ),
    tag = "auth"
)]
#[instrument(skip(ledger, mailer, payload))]
pub async fn request_otp(
    ledger: Extension<PgOtpLedger>,
    mailer: Extension<Mailer>,
    payload: Option<Json<OtpRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.ok_or_else(ApiError::missing_payload)?.0;
    let (email, purpose) = request.validate()?;

    debug!(%email, purpose = purpose.as_str(), "issuing OTP");

    let code = ledger.issue(&email, purpose).await?;

    // The response below is constant whether the email is registered or not.
    mailer.send_otp(&email, &code, purpose).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Código enviado" })),
    ))
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct OtpVerifyRequest {
    email: String,
    code: String,
    purpose: String,
}

impl OtpVerifyRequest {
    fn validate(&self) -> Result<(String, OtpPurpose), ApiError> {
        let mut errors = Vec::new();

        let email = normalize_email(&self.email);
        if !valid_email(&email) {
            errors.push(FieldError::new("email", "Correo electrónico inválido"));
        }

        if !valid_otp_code(&self.code) {
            errors.push(FieldError::new("code", "El código debe tener 6 dígitos"));
        }

        let purpose = OtpPurpose::parse(&self.purpose);
        if purpose.is_none() {
            errors.push(FieldError::new("purpose", "Propósito desconocido"));
        }

        match purpose {
            Some(purpose) if errors.is_empty() => Ok((email, purpose)),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Verification attempted, result in the body"),
        (status = 400, description = "Invalid email, code shape or purpose"),
    ),
    tag = "auth"
)]
#[instrument(skip(ledger, payload))]
pub async fn verify_otp(
    ledger: Extension<PgOtpLedger>,
    payload: Option<Json<OtpVerifyRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.ok_or_else(ApiError::missing_payload)?.0;
    let (email, purpose) = request.validate()?;

    let verification = ledger.verify(&email, &request.code, purpose).await?;

    debug!(%email, purpose = purpose.as_str(), valid = verification.valid, "OTP verification attempt");

    Ok(Json(json!({
        "verified": verification.valid,
        "message": verification.message,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_normalizes_email() {
        let request = OtpRequest {
            email: "  Ana@X.COM ".to_string(),
            purpose: "register".to_string(),
        };
        let (email, purpose) = request.validate().unwrap();
        assert_eq!(email, "ana@x.com");
        assert_eq!(purpose, OtpPurpose::Register);
    }

    #[test]
    fn request_validation_rejects_unknown_purpose() {
        let request = OtpRequest {
            email: "ana@x.com".to_string(),
            purpose: "signup".to_string(),
        };
        let Err(ApiError::Validation(errors)) = request.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "purpose");
    }

    #[test]
    fn verify_validation_collects_all_field_errors() {
        let request = OtpVerifyRequest {
            email: "not-an-email".to_string(),
            code: "12".to_string(),
            purpose: "signup".to_string(),
        };
        let Err(ApiError::Validation(errors)) = request.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "code", "purpose"]);
    }
}
