//! User records and their PostgreSQL repository.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Self-reported gender, kept in the wording the mobile app shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "Hombre")]
    Hombre,
    #[serde(rename = "Mujer")]
    Mujer,
    #[serde(rename = "Prefiero no decirlo")]
    PrefieroNoDecirlo,
    #[serde(rename = "Otro")]
    Otro,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hombre => "Hombre",
            Self::Mujer => "Mujer",
            Self::PrefieroNoDecirlo => "Prefiero no decirlo",
            Self::Otro => "Otro",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Hombre" => Some(Self::Hombre),
            "Mujer" => Some(Self::Mujer),
            "Prefiero no decirlo" => Some(Self::PrefieroNoDecirlo),
            "Otro" => Some(Self::Otro),
            _ => None,
        }
    }
}

/// Full row, password hash included. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub created_at: DateTime<Utc>,
}

/// Public projection returned by login and /api/me.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
        }
    }
}

/// Insert payload, password already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone)]
pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a row exists with this email or this username.
    pub async fn exists(&self, email: &str, username: &str) -> Result<bool, sqlx::Error> {
        let query =
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2) AS exists";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(username)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.get("exists"))
    }

    pub async fn insert(&self, user: &NewUser) -> Result<Uuid, sqlx::Error> {
        let query = "INSERT INTO users (name, username, email, password_hash, date_of_birth, gender) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING id";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.date_of_birth)
            .bind(user.gender.map(Gender::as_str))
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.get("id"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let query = "SELECT id, name, username, email, password_hash, date_of_birth, gender, created_at \
                     FROM users WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(map_user_row))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
        let query = "SELECT id, name, username, email, password_hash, date_of_birth, gender, created_at \
                     FROM users WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(map_user_row))
    }
}

fn map_user_row(row: sqlx::postgres::PgRow) -> UserRecord {
    let gender: Option<String> = row.get("gender");
    UserRecord {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        date_of_birth: row.get("date_of_birth"),
        gender: gender.as_deref().and_then(Gender::parse),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_round_trip() {
        for gender in [
            Gender::Hombre,
            Gender::Mujer,
            Gender::PrefieroNoDecirlo,
            Gender::Otro,
        ] {
            assert_eq!(Gender::parse(gender.as_str()), Some(gender));
        }
        assert_eq!(Gender::parse("otro"), None);
    }

    #[test]
    fn gender_serde_uses_app_wording() {
        let json = serde_json::to_string(&Gender::PrefieroNoDecirlo).unwrap();
        assert_eq!(json, "\"Prefiero no decirlo\"");

        let parsed: Gender = serde_json::from_str("\"Mujer\"").unwrap();
        assert_eq!(parsed, Gender::Mujer);
    }

    #[test]
    fn profile_never_carries_the_hash() {
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            username: "ana.garcia".to_string(),
            email: "ana@x.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            date_of_birth: None,
            gender: Some(Gender::Mujer),
            created_at: Utc::now(),
        };

        let profile = UserProfile::from(user);
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["gender"], "Mujer");
        assert_eq!(json["dateOfBirth"], serde_json::Value::Null);
    }
}
