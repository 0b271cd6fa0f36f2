//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs signed with the server secret. Verification is
//! belt-and-braces: the signed `exp` claim is checked by the library, and the
//! claim's age (`now - iat`) is checked again against a server-side maximum
//! independent of whatever `exp` the token carries.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::users::UserRecord;

/// Claims embedded in every session token. Values are copied from the user
/// row at mint time; /api/me reads the store for current data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

/// Mint a session token for a freshly authenticated user.
pub fn issue(
    user: &UserRecord,
    secret: &str,
    ttl_days: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        username: user.username.clone(),
        iat: now,
        exp: now + Duration::days(ttl_days).num_seconds(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and both expiry clocks, returning the claims.
pub fn verify(token: &str, secret: &str, max_age_seconds: i64) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub", "iat"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    // Second clock: server-side cap on token age, independent of `exp`.
    let age = Utc::now().timestamp() - data.claims.iat;
    if age > max_age_seconds {
        return Err(TokenError::Expired);
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserRecord;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn test_user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: "Ana García".to_string(),
            username: "ana.garcia".to_string(),
            email: "ana@x.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            date_of_birth: None,
            gender: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let user = test_user();
        let token = issue(&user, SECRET, 7).unwrap();

        let claims = verify(&token, SECRET, 604_800).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "ana@x.com");
        assert_eq!(claims.name, "Ana García");
        assert_eq!(claims.username, "ana.garcia");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn wrong_secret_fails_with_invalid_signature() {
        let token = issue(&test_user(), SECRET, 7).unwrap();
        assert_eq!(
            verify(&token, "other-secret", 604_800),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_fails_as_malformed() {
        assert_eq!(
            verify("not.a.token", SECRET, 604_800),
            Err(TokenError::Malformed)
        );
        assert_eq!(verify("", SECRET, 604_800), Err(TokenError::Malformed));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Signed exp in the past; jsonwebtoken's default 60s leeway is why
        // the TTL here is minus one day rather than minus one second.
        let token = issue(&test_user(), SECRET, -1).unwrap();
        assert_eq!(verify(&token, SECRET, 604_800), Err(TokenError::Expired));
    }

    #[test]
    fn max_age_caps_tokens_with_far_future_exp() {
        // exp says 7 days, but the server-side cap is zero seconds.
        let token = issue(&test_user(), SECRET, 7).unwrap();
        assert_eq!(verify(&token, SECRET, -1), Err(TokenError::Expired));
    }
}
