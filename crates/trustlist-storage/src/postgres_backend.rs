//! PostgreSQL storage backend.
//!
//! All documents live in one `documents` table keyed by the storage key.
//! Uses `sqlx` with the Tokio runtime, so no blocking offload is needed.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::{StorageBackend, StorageError};

/// A storage backend backed by PostgreSQL.
///
/// ```no_run
/// # use trustlist_storage::PostgresBackend;
/// # #[tokio::main]
/// # async fn main() {
/// let backend = PostgresBackend::connect("postgres://localhost/trustlist").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresBackend {
    /// Connect and create the `documents` table if it is missing.
    ///
    /// The connection string is never included in errors; it usually
    /// carries a password.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or table creation fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Open {
                location: "postgres".to_owned(),
                reason: e.to_string(),
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (\
                key        TEXT        PRIMARY KEY, \
                body       BYTEA       NOT NULL, \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::Open {
            location: "postgres".to_owned(),
            reason: format!("table creation failed: {e}"),
        })?;

        tracing::debug!("postgres documents table ready");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl StorageBackend for PostgresBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT body FROM documents WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(row.map(|(body,)| body))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO documents (key, body) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM documents WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Literal prefix match: '%' and '_' in emails are not wildcards.
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT key FROM documents WHERE starts_with(key, $1) ORDER BY key")
                .bind(prefix)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::List {
                    prefix: prefix.to_owned(),
                    reason: e.to_string(),
                })?;

        Ok(rows.into_iter().map(|(k,)| k).collect())
    }
}
