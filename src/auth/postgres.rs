//! PostgreSQL credential store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use super::store::{CredentialStore, StoreError, User};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Create the `users` table if missing.
    ///
    /// # Errors
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(query_span("CREATE", SCHEMA_SQL))
            .await
            .context("failed to apply users schema")?;

        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("hashed_password"),
        session_token: row.get("session_token"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let query = r"
            SELECT id, email, hashed_password, session_token
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        row.as_ref().map(user_from_row).ok_or(StoreError::NotFound)
    }

    async fn find_by_session(&self, session_token: &str) -> Result<User, StoreError> {
        let query = r"
            SELECT id, email, hashed_password, session_token
            FROM users
            WHERE session_token = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(session_token)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        row.as_ref().map(user_from_row).ok_or(StoreError::NotFound)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            RETURNING id, email, hashed_password, session_token
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let query = "UPDATE users SET session_token = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(session_token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound),
            Ok(_) => Ok(()),
            // only session_token is unique among the updated columns
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateSession),
            Err(err) => Err(err.into()),
        }
    }
}
