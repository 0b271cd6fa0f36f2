//! PostgreSQL implementation of [`OtpStore`](super::OtpStore).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{OtpCode, OtpPurpose, OtpStore};

#[derive(Debug, Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OtpStore for PgOtpStore {
    async fn supersede(&self, email: &str, purpose: OtpPurpose) -> Result<u64, sqlx::Error> {
        let query = "UPDATE otp_codes SET used = TRUE WHERE email = $1 AND purpose = $2";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(email)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert(&self, code: &OtpCode) -> Result<(), sqlx::Error> {
        let query = "INSERT INTO otp_codes (id, email, code, purpose, expires_at, used, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(code.id)
            .bind(&code.email)
            .bind(&code.code)
            .bind(code.purpose.as_str())
            .bind(code.expires_at)
            .bind(code.used)
            .bind(code.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }

    async fn find_valid(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCode>, sqlx::Error> {
        let query = "SELECT id, email, code, expires_at, used, created_at FROM otp_codes \
                     WHERE email = $1 AND code = $2 AND purpose = $3 AND used = FALSE AND expires_at > $4 \
                     ORDER BY created_at DESC, id DESC LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(code)
            .bind(purpose.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| OtpCode {
            id: row.get("id"),
            email: row.get("email"),
            code: row.get("code"),
            purpose,
            expires_at: row.get("expires_at"),
            used: row.get("used"),
            created_at: row.get("created_at"),
        }))
    }

    async fn mark_used(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let query = "UPDATE otp_codes SET used = TRUE WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }

    async fn latest_used(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpCode>, sqlx::Error> {
        let query = "SELECT id, email, code, expires_at, used, created_at FROM otp_codes \
                     WHERE email = $1 AND purpose = $2 AND used = TRUE \
                     ORDER BY created_at DESC, id DESC LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| OtpCode {
            id: row.get("id"),
            email: row.get("email"),
            code: row.get("code"),
            purpose,
            expires_at: row.get("expires_at"),
            used: row.get("used"),
            created_at: row.get("created_at"),
        }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let query = "DELETE FROM otp_codes WHERE expires_at < $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(result.rows_affected())
    }
}
