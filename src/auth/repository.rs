// Credential and session stores backed by the users table

use crate::auth::models::{NewUser, User};
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, sessions, created_at";

/// Failures of a user insert
#[derive(Debug, Error)]
pub enum InsertUserError {
    #[error("username already exists")]
    DuplicateUsername,

    #[error("email already exists")]
    DuplicateEmail,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence of user accounts
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user and return its id
    async fn create_user(&self, user: &NewUser) -> Result<Uuid, InsertUserError>;

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error>;

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error>;

    /// Find a user whose username or email equals `identifier`
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
}

/// Per-user list of refresh-token digests
///
/// Every method is a single atomic statement; none of them reads the list and
/// writes it back.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append a digest; returns false when no user row was changed
    async fn add_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error>;

    /// Find the user whose session list contains the digest
    async fn find_user_by_session(&self, digest: &str) -> Result<Option<User>, sqlx::Error>;

    /// Remove one digest; removing an absent digest is not an error
    async fn revoke_session(&self, username: &str, digest: &str) -> Result<(), sqlx::Error>;

    /// Empty the session list
    async fn revoke_all(&self, username: &str) -> Result<(), sqlx::Error>;

    /// Remove the digest and report whether this call was the one that removed it
    async fn consume_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error>;
}

/// Postgres implementation of both stores
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<Uuid, InsertUserError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Check for unique constraint violation
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        Some("idx_users_email") => InsertUserError::DuplicateEmail,
                        _ => InsertUserError::DuplicateUsername,
                    };
                }
            }
            InsertUserError::Database(e)
        })?;

        Ok(id)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl SessionStore for PgUserRepository {
    async fn add_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET sessions = array_append(sessions, $2) WHERE username = $1")
                .bind(username)
                .bind(digest)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_user_by_session(&self, digest: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE sessions @> ARRAY[$1::text] LIMIT 1"
        ))
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
    }

    async fn revoke_session(&self, username: &str, digest: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET sessions = array_remove(sessions, $2) WHERE username = $1")
            .bind(username)
            .bind(digest)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all(&self, username: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET sessions = '{}' WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn consume_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error> {
        // The row lock taken by UPDATE serialises concurrent consumers; the loser
        // re-evaluates the WHERE clause against the new list and matches nothing.
        let consumed: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET sessions = array_remove(sessions, $2)
            WHERE username = $1 AND sessions @> ARRAY[$2::text]
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumed.is_some())
    }
}
