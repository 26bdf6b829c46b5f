use async_trait::async_trait;
use hoplink_core::repository::Result;
use hoplink_core::{NewUrlRecord, Repository, ShortCode, ShortUrlRecord, StorageError};
use jiff::Timestamp;
use sqlx::{MySqlPool, Row};

/// MySQL implementation of the repository contract.
///
/// Deletes are hard deletes so a code can be reissued after removal.
/// Reads return expired rows unchanged; expiry policy belongs to the
/// resolution service. Timestamps are stored as unix seconds.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE short_urls (
///     short_code   VARCHAR(32) NOT NULL PRIMARY KEY,
///     original_url TEXT        NOT NULL,
///     created_at   BIGINT      NOT NULL,
///     updated_at   BIGINT      NOT NULL,
///     expires_at   BIGINT      NULL
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn parse_timestamp(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|e| StorageError::InvalidData(format!("invalid timestamp '{}': {e}", seconds)))
}

fn parse_expires_at(seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds.map(parse_timestamp).transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn record_from_row(code: &ShortCode, row: &sqlx::mysql::MySqlRow) -> Result<ShortUrlRecord> {
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;
    let expires_at_raw: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;

    Ok(ShortUrlRecord {
        short_code: code.clone(),
        original_url,
        created_at: parse_timestamp(created_at)?,
        updated_at: parse_timestamp(updated_at)?,
        expires_at: parse_expires_at(expires_at_raw)?,
    })
}

#[async_trait]
impl Repository for MySqlStore {
    async fn find(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, created_at, updated_at, expires_at
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(record_from_row(code, &row)?))
    }

    async fn insert(&self, record: NewUrlRecord) -> Result<ShortUrlRecord> {
        let now = now_unix_seconds();
        let expires_at = record.expires_at.map(|ts| ts.as_second());

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (short_code, original_url, created_at, updated_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(&record.original_url)
        .bind(now)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                let created_at = parse_timestamp(now)?;
                Ok(ShortUrlRecord {
                    short_code: record.short_code,
                    original_url: record.original_url,
                    created_at,
                    updated_at: created_at,
                    expires_at: record.expires_at,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_url(&self, code: &ShortCode, new_url: &str) -> Result<Option<ShortUrlRecord>> {
        let now = now_unix_seconds();

        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET original_url = ?, updated_at = ?
            WHERE short_code = ?
            "#,
        )
        .bind(new_url)
        .bind(now)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        // Re-read for created_at; the row may have been deleted in the
        // meantime, which the caller already treats as "gone".
        self.find(code).await
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_codes(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code
            FROM short_urls
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("short_code").map_err(map_sqlx_error))
            .collect()
    }
}
