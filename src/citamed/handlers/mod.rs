pub mod health;
pub use self::health::health;

pub mod otp;
pub use self::otp::{request_otp, verify_otp};

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

pub mod me;
pub use self::me::me;

// common functions for the handlers
use axum::http::{header::AUTHORIZATION, HeaderMap};
use regex::Regex;

use crate::citamed::error::ApiError;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Trim and lowercase, the canonical form stored and compared everywhere.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9._-]{2,60}$").is_ok_and(|re| re.is_match(username))
}

pub fn valid_otp_code(code: &str) -> bool {
    code.len() == crate::otp::OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the bearer token from the Authorization header.
///
/// The error messages distinguish a broken header from a missing token, but
/// never why a token failed verification.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Auth("Cabecera de autorización inválida"))?;

    if header == "Bearer" {
        return Err(ApiError::Auth("Token requerido"));
    }

    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        Some(("Bearer", _)) => Err(ApiError::Auth("Token requerido")),
        _ => Err(ApiError::Auth("Cabecera de autorización inválida")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn email_validation() {
        assert!(valid_email("ana@x.com"));
        assert!(valid_email("ana.garcia+test@clinica.example.org"));
        assert!(!valid_email("ana@x"));
        assert!(!valid_email("ana x@x.com"));
        assert!(!valid_email("@x.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ana@X.COM "), "ana@x.com");
    }

    #[test]
    fn username_validation() {
        assert!(valid_username("ana.garcia"));
        assert!(valid_username("ana_garcia-99"));
        assert!(!valid_username("a"));
        assert!(!valid_username("ana garcia"));
        assert!(!valid_username("ana@garcia"));
        assert!(!valid_username(&"a".repeat(61)));
    }

    #[test]
    fn otp_code_validation() {
        assert!(valid_otp_code("000000"));
        assert!(valid_otp_code("123456"));
        assert!(!valid_otp_code("12345"));
        assert!(!valid_otp_code("1234567"));
        assert!(!valid_otp_code("12345a"));
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();

        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Auth("Cabecera de autorización inválida"))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Auth("Token requerido"))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Auth("Token requerido"))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Auth("Cabecera de autorización inválida"))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
