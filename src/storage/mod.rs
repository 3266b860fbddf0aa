//! Persistence of classification results in a SQL table.
//!
//! The table is expected to exist already:
//!
//! ```sql
//! CREATE TABLE sdg_results (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     text TEXT,
//!     keywords TEXT,
//!     sdg_classification TEXT
//! );
//! ```
//!
//! Every operation checks a connection out of the pool for its own duration; the connection
//! returns to the pool when the guard drops, on success and on error alike. Statements are
//! auto-committed. "Latest" means the row with the highest id.
//!
//! MySQL reports `TEXT` columns with its blob wire type, so through the `Any` driver they arrive
//! as bytes rather than strings. Reads accept either shape and decode bytes as UTF-8.

use crate::config::Config;
use sqlx::any::{AnyPoolOptions, AnyRow, install_default_drivers};
use sqlx::{AnyPool, Row, pool::PoolConnection};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const INSERT_RESULT: &str =
    "INSERT INTO sdg_results (text, keywords, sdg_classification) VALUES (?, ?, ?)";
const SELECT_LATEST: &str =
    "SELECT sdg_classification FROM sdg_results WHERE id IN (SELECT MAX(id) FROM sdg_results)";

/// Errors raised by the results store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Driver or database rejected the operation.
    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),
    /// Operation did not finish within the configured timeout.
    #[error("Database operation timed out after {0} seconds")]
    Timeout(u64),
    /// Driver did not report the id of the inserted row.
    #[error("Database did not report the inserted row id")]
    MissingInsertId,
}

/// One-column row holding a stored classification; serializes as `["..."]`.
pub type ClassificationRow = (String,);

/// Flatten keyphrases into the single comma-separated column value.
pub fn join_keywords(keywords: &[String]) -> String {
    keywords.join(", ")
}

/// Pooled access to the `sdg_results` table.
#[derive(Clone)]
pub struct ClassificationStore {
    pool: AnyPool,
    timeout: Duration,
}

impl ClassificationStore {
    /// Open a connection pool for `config.database_url`.
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        install_default_drivers();
        let timeout = config.database_timeout();
        let pool = AnyPoolOptions::new()
            .max_connections(config.database_max_connections.max(1))
            .acquire_timeout(timeout)
            .connect(&config.database_url)
            .await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "Database pool ready"
        );
        Ok(Self::from_pool(pool, timeout))
    }

    /// Wrap an existing pool; `timeout` bounds each acquire and statement.
    pub fn from_pool(pool: AnyPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Insert one result row and return its id.
    pub async fn store(
        &self,
        text: &str,
        keywords: &[String],
        classification: &str,
    ) -> Result<i64, StorageError> {
        let keywords = join_keywords(keywords);
        let mut conn = self.acquire().await?;
        let result = self
            .bounded(
                sqlx::query(INSERT_RESULT)
                    .bind(text)
                    .bind(keywords)
                    .bind(classification)
                    .execute(&mut *conn),
            )
            .await?;
        let id = result.last_insert_id().ok_or(StorageError::MissingInsertId)?;
        tracing::info!(id, "Classification stored");
        Ok(id)
    }

    /// Return the classification of the row with the highest id; empty when the table is empty.
    pub async fn retrieve_latest(&self) -> Result<Vec<ClassificationRow>, StorageError> {
        let mut conn = self.acquire().await?;
        let rows = self
            .bounded(sqlx::query(SELECT_LATEST).fetch_all(&mut *conn))
            .await?
            .iter()
            .map(|row| text_column(row, 0).map(|classification| (classification,)))
            .collect::<Result<Vec<ClassificationRow>, _>>()?;
        tracing::debug!(rows = rows.len(), "Latest classification retrieved");
        Ok(rows)
    }

    async fn acquire(&self) -> Result<PoolConnection<sqlx::Any>, StorageError> {
        self.bounded(self.pool.acquire()).await
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StorageError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Decode a text column that the driver may report either as text or as a blob.
fn text_column(row: &AnyRow, index: usize) -> Result<String, sqlx::Error> {
    match row.try_get::<Option<String>, _>(index) {
        Ok(text) => Ok(text.unwrap_or_default()),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let bytes: Option<Vec<u8>> = row.try_get(index)?;
            String::from_utf8(bytes.unwrap_or_default())
                .map_err(|error| sqlx::Error::Decode(Box::new(error)))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const SCHEMA: &str = "CREATE TABLE sdg_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        keywords TEXT NOT NULL,
        sdg_classification TEXT NOT NULL
    )";

    async fn store_in(dir: &tempfile::TempDir, max_connections: u32) -> ClassificationStore {
        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.database_url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("results.db").display()
        );
        config.database_max_connections = max_connections;
        let store = ClassificationStore::connect(&config).await.expect("pool");
        sqlx::query(SCHEMA)
            .execute(&store.pool)
            .await
            .expect("schema");
        store
    }

    #[test]
    fn keywords_are_comma_joined() {
        let keywords = vec!["clean water".to_string(), "sanitation".to_string()];
        assert_eq!(join_keywords(&keywords), "clean water, sanitation");
    }

    #[tokio::test]
    async fn empty_table_has_no_latest_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir, 1).await;
        assert!(store.retrieve_latest().await.expect("rows").is_empty());
    }

    #[tokio::test]
    async fn latest_row_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir, 2).await;

        store
            .store("first", &["alpha".into()], "SDG 1: No Poverty")
            .await
            .expect("first insert");
        let id = store
            .store("second", &["beta".into(), "gamma".into()], "SDG 5: Gender Equality")
            .await
            .expect("second insert");

        let rows = store.retrieve_latest().await.expect("rows");
        assert_eq!(rows, vec![("SDG 5: Gender Equality".to_string(),)]);

        let (keywords,): (String,) =
            sqlx::query_as("SELECT keywords FROM sdg_results WHERE id = ?")
                .bind(id)
                .fetch_one(&store.pool)
                .await
                .expect("stored keywords");
        assert_eq!(keywords, "beta, gamma");
    }

    #[tokio::test]
    async fn blob_typed_columns_decode_as_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir, 1).await;

        let row = sqlx::query("SELECT CAST(? AS BLOB)")
            .bind("SDG 14: Life Below Water")
            .fetch_one(&store.pool)
            .await
            .expect("blob row");
        assert_eq!(
            text_column(&row, 0).expect("decoded"),
            "SDG 14: Life Below Water"
        );

        let row = sqlx::query("SELECT CAST(? AS BLOB)")
            .bind(vec![0xff_u8, 0xfe])
            .fetch_one(&store.pool)
            .await
            .expect("blob row");
        assert!(matches!(text_column(&row, 0), Err(sqlx::Error::Decode(_))));
    }

    #[tokio::test]
    async fn latest_row_stored_as_bytes_is_returned_as_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir, 1).await;

        sqlx::query(
            "INSERT INTO sdg_results (text, keywords, sdg_classification) \
             VALUES ('body', 'water', CAST('SDG 6: Clean Water and Sanitation' AS BLOB))",
        )
        .execute(&store.pool)
        .await
        .expect("insert blob row");

        assert_eq!(
            store.retrieve_latest().await.expect("rows"),
            vec![("SDG 6: Clean Water and Sanitation".to_string(),)]
        );
    }

    #[tokio::test]
    async fn concurrent_stores_get_distinct_increasing_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir, 4).await;

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .store(&format!("document {index}"), &[], &format!("result {index}"))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("task").expect("insert"));
        }

        let unique: BTreeSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        let max_id = *unique.last().expect("ids");

        let (latest,): (String,) =
            sqlx::query_as("SELECT sdg_classification FROM sdg_results WHERE id = ?")
                .bind(max_id)
                .fetch_one(&store.pool)
                .await
                .expect("latest row");
        assert_eq!(
            store.retrieve_latest().await.expect("rows"),
            vec![(latest,)]
        );
    }
}
