//! Postgres-backed account repository.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Connection, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{Account, AccountRepository, CreateOutcome, NewAccount};
use crate::auth::utils::unix_now;

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, is_email_verified, \
     verification_token, verification_expires_at, federated_id, created_at, updated_at";

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        is_email_verified: row.get("is_email_verified"),
        verification_token: row.get("verification_token"),
        verification_expires_at: row.get("verification_expires_at"),
        federated_id: row.get("federated_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountRepository for PgRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by email")?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by id")?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome> {
        let now = unix_now();
        let id = Uuid::new_v4();
        let query = r"
            INSERT INTO accounts
                (id, email, username, password_hash, is_email_verified, federated_id,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.is_email_verified)
            .bind(&account.federated_id)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created(Account {
                id,
                email: account.email,
                username: account.username,
                password_hash: account.password_hash,
                is_email_verified: account.is_email_verified,
                verification_token: None,
                verification_expires_at: None,
                federated_id: account.federated_id,
                created_at: now,
                updated_at: now,
            })),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::DuplicateEmail),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn set_verification_challenge(
        &self,
        id: Uuid,
        token: &str,
        expires_at: i64,
    ) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET verification_token = $2,
                verification_expires_at = $3,
                updated_at = $4
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .bind(unix_now())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store verification challenge")?;

        if result.rows_affected() == 0 {
            bail!("account {id} not found");
        }
        Ok(())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE verification_token = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by verification token")?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn clear_verification_and_mark_verified(&self, id: Uuid) -> Result<bool> {
        // Single-statement compare-and-swap: only one concurrent redeemer
        // can observe a non-null token.
        let query = r"
            UPDATE accounts
            SET is_email_verified = TRUE,
                verification_token = NULL,
                verification_expires_at = NULL,
                updated_at = $2
            WHERE id = $1
              AND verification_token IS NOT NULL
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(unix_now())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume verification challenge")?;
        Ok(row.is_some())
    }

    async fn ping(&self) -> Result<()> {
        let span = tracing::info_span!(
            "db.ping",
            db.system = "postgresql",
            db.operation = "PING"
        );
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(span)
            .await
            .context("failed to ping database")
    }
}
