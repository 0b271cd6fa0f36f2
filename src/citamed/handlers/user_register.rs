//! Account creation, gated on a previously consumed registration OTP.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::auth::password;
use crate::citamed::error::{ApiError, FieldError};
use crate::citamed::handlers::{normalize_email, valid_email, valid_username};
use crate::otp::{OtpPurpose, PgOtpLedger};
use crate::users::{Gender, NewUser, PgUsers};

pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 72;

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    name: String,
    username: String,
    email: String,
    password: String,
    #[serde(rename = "dateOfBirth")]
    date_of_birth: Option<String>,
    gender: Option<String>,
}

impl RegisterRequest {
    fn validate(&self) -> Result<NewUser, ApiError> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if !(2..=120).contains(&name.chars().count()) {
            errors.push(FieldError::new(
                "name",
                "El nombre debe tener entre 2 y 120 caracteres",
            ));
        }

        let username = self.username.trim();
        if !valid_username(username) {
            errors.push(FieldError::new(
                "username",
                "El usuario debe tener entre 2 y 60 caracteres: letras, números, '.', '_' o '-'",
            ));
        }

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

        let date_of_birth = match &self.date_of_birth {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push(FieldError::new(
                        "dateOfBirth",
                        "La fecha debe tener formato AAAA-MM-DD",
                    ));
                    None
                }
            },
            None => None,
        };

        let gender = match &self.gender {
            Some(raw) => match Gender::parse(raw) {
                Some(gender) => Some(gender),
                None => {
                    errors.push(FieldError::new("gender", "Género desconocido"));
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(NewUser {
            name: name.to_string(),
            username: username.to_string(),
            email,
            // Filled by the handler once the password is hashed.
            password_hash: String::new(),
            date_of_birth,
            gender,
        })
    }

    fn password(&self) -> &str {
        &self.password
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Validation failure or email not verified"),
        (status = 409, description = "Email or username already registered"),
    ),
    tag = "auth"
)]
#[instrument(skip(ledger, users, payload))]
pub async fn register(
    ledger: Extension<PgOtpLedger>,
    users: Extension<PgUsers>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.ok_or_else(ApiError::missing_payload)?.0;
    let mut new_user = request.validate()?;

    // Registration is decoupled from code entry: the consumed register OTP
    // stands as proof of email ownership.
    if !ledger
        .has_verified_recently(&new_user.email, OtpPurpose::Register)
        .await?
    {
        return Err(ApiError::BadRequest(
            "Verifica tu correo electrónico antes de registrarte",
        ));
    }

    if users.exists(&new_user.email, &new_user.username).await? {
        return Err(ApiError::Conflict("Correo o usuario ya registrado"));
    }

    new_user.password_hash = password::hash_password(request.password())?;

    let id = users.insert(&new_user).await?;

    debug!(user_id = %id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Usuario creado" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            name: "Ana García".to_string(),
            username: "ana.garcia".to_string(),
            email: "Ana@X.com".to_string(),
            password: "hunter2!pass".to_string(),
            date_of_birth: Some("1994-05-17".to_string()),
            gender: Some("Mujer".to_string()),
        }
    }

    #[test]
    fn valid_request_passes_and_normalizes() {
        let new_user = request().validate().unwrap();
        assert_eq!(new_user.email, "ana@x.com");
        assert_eq!(new_user.username, "ana.garcia");
        assert_eq!(
            new_user.date_of_birth,
            Some(NaiveDate::from_ymd_opt(1994, 5, 17).unwrap())
        );
        assert_eq!(new_user.gender, Some(Gender::Mujer));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut req = request();
        req.date_of_birth = None;
        req.gender = None;

        let new_user = req.validate().unwrap();
        assert_eq!(new_user.date_of_birth, None);
        assert_eq!(new_user.gender, None);
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = request();
        // An early app revision accepted 3 characters; 8 is the floor here.
        req.password = "abc".to_string();

        let Err(ApiError::Validation(errors)) = req.validate() else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.field == "password"));
    }

    #[test]
    fn bad_date_and_gender_are_field_errors() {
        let mut req = request();
        req.date_of_birth = Some("17/05/1994".to_string());
        req.gender = Some("mujer".to_string());

        let Err(ApiError::Validation(errors)) = req.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["dateOfBirth", "gender"]);
    }

    #[test]
    fn name_length_bounds() {
        let mut req = request();
        req.name = "A".to_string();
        assert!(req.validate().is_err());

        req.name = "á".repeat(120);
        assert!(req.validate().is_ok());

        req.name = "á".repeat(121);
        assert!(req.validate().is_err());
    }
}
