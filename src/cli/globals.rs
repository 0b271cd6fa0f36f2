use secrecy::SecretString;

use crate::mailer::SmtpConfig;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub jwt_secret: SecretString,
    pub token_ttl_days: i64,
    pub token_max_age_seconds: i64,
    pub otp_ttl_minutes: i64,
    pub cors_origin: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            token_ttl_days: 7,
            token_max_age_seconds: 604_800,
            otp_ttl_minutes: 10,
            cors_origin: None,
            smtp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(SecretString::from("s3cret".to_string()));
        assert_eq!(args.jwt_secret.expose_secret(), "s3cret");
        assert_eq!(args.token_ttl_days, 7);
        assert_eq!(args.token_max_age_seconds, 604_800);
        assert_eq!(args.otp_ttl_minutes, 10);
        assert!(args.cors_origin.is_none());
        assert!(args.smtp.is_none());
    }
}
