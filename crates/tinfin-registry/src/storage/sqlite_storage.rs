//! SQLite storage for token and payment records
//!
//! Timestamps are stored as Unix seconds. The single-live-token rule is
//! enforced by one conditional `INSERT ... SELECT ... WHERE NOT EXISTS`
//! statement, which SQLite executes atomically.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqliteRow};
use std::str::FromStr;
use time::OffsetDateTime;
use tinfin::{RevocationError, RevocationState, RevocationStore};

use super::{PaymentStore, TokenStore};
use crate::entities::{PaymentRecord, PaymentStatus, TokenRecord};
use crate::error::{RegistryError, Result};

/// SQLite-based record storage implementation
pub struct SqliteStorage {
    pool: SqlitePool,
}

fn db_error(context: &str, e: sqlx::Error) -> RegistryError {
    RegistryError::Storage(format!("{}: {}", context, e))
}

impl SqliteStorage {
    /// Create a new SQLite storage instance with the given database path
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_path)
            .map_err(|e| RegistryError::Storage(format!("Invalid database path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to SQLite", e))?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                jti TEXT NOT NULL UNIQUE,
                token_hash TEXT NOT NULL,      -- sha256 of the compact token, never the token
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create tokens table", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,           -- provider order id
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                amount INTEGER NOT NULL,
                currency TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create payments table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id, revoked, expires_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create tokens user index", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id, status)")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create payments user index", e))?;

        Ok(())
    }

    fn row_to_token(row: &SqliteRow) -> Result<TokenRecord> {
        let created_at: i64 = row.try_get("created_at").map_err(|e| db_error("created_at", e))?;
        let expires_at: i64 = row.try_get("expires_at").map_err(|e| db_error("expires_at", e))?;

        Ok(TokenRecord {
            id: row.try_get("id").map_err(|e| db_error("id", e))?,
            user_id: row.try_get("user_id").map_err(|e| db_error("user_id", e))?,
            name: row.try_get("name").map_err(|e| db_error("name", e))?,
            jti: row.try_get("jti").map_err(|e| db_error("jti", e))?,
            token_hash: row.try_get("token_hash").map_err(|e| db_error("token_hash", e))?,
            created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
            expires_at: OffsetDateTime::from_unix_timestamp(expires_at)?,
            revoked: row.try_get("revoked").map_err(|e| db_error("revoked", e))?,
        })
    }

    fn row_to_payment(row: &SqliteRow) -> Result<PaymentRecord> {
        let status: String = row.try_get("status").map_err(|e| db_error("status", e))?;
        let created_at: i64 = row.try_get("created_at").map_err(|e| db_error("created_at", e))?;

        Ok(PaymentRecord {
            id: row.try_get("id").map_err(|e| db_error("id", e))?,
            user_id: row.try_get("user_id").map_err(|e| db_error("user_id", e))?,
            status: status.parse()?,
            amount: row.try_get("amount").map_err(|e| db_error("amount", e))?,
            currency: row.try_get("currency").map_err(|e| db_error("currency", e))?,
            created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
        })
    }

    async fn revoke_where(&self, column: &str, value: &str, user_id: &str) -> Result<()> {
        // column is one of two fixed identifiers, never caller input
        let sql = format!("UPDATE tokens SET revoked = 1 WHERE {} = ? AND user_id = ?", column);

        let result = sqlx::query(&sql)
            .bind(value)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to revoke token", e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::TokenNotFound(value.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for SqliteStorage {
    async fn revocation_state(&self, jti: &str) -> std::result::Result<RevocationState, RevocationError> {
        let row = sqlx::query("SELECT revoked FROM tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevocationError(e.to_string()))?;

        match row {
            None => Ok(RevocationState::Unknown),
            Some(row) => {
                let revoked: bool = row
                    .try_get("revoked")
                    .map_err(|e| RevocationError(e.to_string()))?;
                Ok(if revoked {
                    RevocationState::Revoked
                } else {
                    RevocationState::Active
                })
            }
        }
    }
}

#[async_trait]
impl TokenStore for SqliteStorage {
    async fn insert_if_no_active(&self, record: &TokenRecord, now: OffsetDateTime) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO tokens (id, user_id, name, jti, token_hash, created_at, expires_at, revoked)
            SELECT ?, ?, ?, ?, ?, ?, ?, 0
            WHERE NOT EXISTS (
                SELECT 1 FROM tokens
                WHERE user_id = ? AND revoked = 0 AND expires_at > ?
            )
        "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.name)
        .bind(&record.jti)
        .bind(&record.token_hash)
        .bind(record.created_at.unix_timestamp())
        .bind(record.expires_at.unix_timestamp())
        .bind(&record.user_id)
        .bind(now.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert token", e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::ActiveTokenExists(record.user_id.clone()));
        }
        Ok(())
    }

    async fn revoke_by_jti(&self, user_id: &str, jti: &str) -> Result<()> {
        self.revoke_where("jti", jti, user_id).await
    }

    async fn revoke_by_id(&self, user_id: &str, id: &str) -> Result<()> {
        self.revoke_where("id", id, user_id).await
    }

    async fn list_unrevoked(&self, user_id: &str) -> Result<Vec<TokenRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM tokens WHERE user_id = ? AND revoked = 0 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list tokens", e))?;

        rows.iter().map(Self::row_to_token).collect()
    }

    async fn get_by_jti(&self, jti: &str) -> Result<Option<TokenRecord>> {
        let row = sqlx::query("SELECT * FROM tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get token", e))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }
}

#[async_trait]
impl PaymentStore for SqliteStorage {
    async fn upsert_payment(&self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, status, amount, currency, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                status = excluded.status,
                amount = excluded.amount,
                currency = excluded.currency
        "#,
        )
        .bind(&payment.id)
        .bind(&payment.user_id)
        .bind(payment.status.as_str())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.created_at.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save payment", e))?;

        Ok(())
    }

    async fn has_paid(&self, user_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS paid FROM payments WHERE user_id = ? AND status = ?")
            .bind(user_id)
            .bind(PaymentStatus::Paid.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to query payments", e))?;

        let paid: i64 = row.try_get("paid").map_err(|e| db_error("paid", e))?;
        Ok(paid > 0)
    }

    async fn list_payments(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query("SELECT * FROM payments WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list payments", e))?;

        rows.iter().map(Self::row_to_payment).collect()
    }
}
