//! One-time verification codes scoped by (email, purpose).
//!
//! The ledger guarantees that at most one code per (email, purpose) pair can
//! ever validate: issuing a new code marks every prior row for the pair as
//! used, and a successful verification consumes the matched row.

#![allow(async_fn_in_trait)]

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod store;

pub use self::store::PgOtpStore;

/// Ledger wired to the production store.
pub type PgOtpLedger = OtpLedger<PgOtpStore>;

/// Codes are 6 ASCII digits, leading zeros allowed.
pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Login,
    Register,
    PasswordReset,
}

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::PasswordReset => "password_reset",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "password_reset" => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

/// One issued code. The email is a loose reference: registration codes
/// predate the user row they verify.
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a verification attempt. The message is deliberately generic:
/// wrong, expired and already-used codes are indistinguishable to the caller.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Verification {
    pub valid: bool,
    pub message: &'static str,
}

impl Verification {
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            valid: true,
            message: "Código verificado correctamente",
        }
    }

    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            valid: false,
            message: "Código inválido o expirado",
        }
    }
}

/// Storage operations the ledger needs. Production uses [`PgOtpStore`];
/// tests use an in-memory implementation.
pub trait OtpStore: Send + Sync {
    /// Mark every row for (email, purpose) as used. Returns affected rows.
    async fn supersede(&self, email: &str, purpose: OtpPurpose) -> Result<u64, sqlx::Error>;

    async fn insert(&self, code: &OtpCode) -> Result<(), sqlx::Error>;

    /// Most recent unused, unexpired row matching (email, code, purpose).
    /// Ties on `created_at` break on `id` so the newest insert wins even
    /// under a coarse clock.
    async fn find_valid(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCode>, sqlx::Error>;

    async fn mark_used(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// Most recent consumed row for (email, purpose), if any.
    async fn latest_used(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpCode>, sqlx::Error>;

    /// Maintenance only, never called on request paths.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

/// Generate a code of [`OTP_LENGTH`] digits, each drawn independently
/// from 0-9.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct OtpLedger<S> {
    store: S,
    ttl: Duration,
}

impl<S: OtpStore> OtpLedger<S> {
    #[must_use]
    pub fn new(store: S, ttl_minutes: i64) -> Self {
        Self {
            store,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a fresh code, superseding every prior code for the pair. The
    /// code is returned for delivery and must never reach the HTTP caller.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<String, sqlx::Error> {
        let code = generate_code();

        self.store.supersede(email, purpose).await?;

        let now = Utc::now();
        let row = OtpCode {
            id: Uuid::new_v4(),
            email: email.to_string(),
            code: code.clone(),
            purpose,
            expires_at: now + self.ttl,
            used: false,
            created_at: now,
        };

        self.store.insert(&row).await?;

        Ok(code)
    }

    /// Single-use verification: a match consumes the row.
    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<Verification, sqlx::Error> {
        match self.store.find_valid(email, code, purpose, Utc::now()).await? {
            Some(row) => {
                self.store.mark_used(row.id).await?;

                Ok(Verification::valid())
            }
            None => Ok(Verification::invalid()),
        }
    }

    /// Whether a code was ever consumed for (email, purpose). Registration
    /// uses the consumed row as proof across two protocol steps instead of
    /// asking for the code twice.
    pub async fn has_verified_recently(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<bool, sqlx::Error> {
        Ok(self.store.latest_used(email, purpose).await?.is_some())
    }

    /// Delete expired rows. Exposed for maintenance jobs.
    pub async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        self.store.purge_expired(Utc::now()).await
    }
}
