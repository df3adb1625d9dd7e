//! SQLite-backed metadata repository.
//!
//! The backing engine's single-statement atomicity is the only transactional
//! guarantee this layer relies on; cross-statement consistency with the blob
//! directory is the blob store's job.

use async_trait::async_trait;
use imagevault_common::{Error, ImageRecord, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS images (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    filename   TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    changed_at TEXT NOT NULL,
    image_id   TEXT NOT NULL
)";

/// Operations the metadata table supports.
///
/// The seam between the blob store and the backing engine; tests substitute
/// their own implementation where needed.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a new row for `record`.
    ///
    /// A unique-constraint conflict (a racing insert of the same filename)
    /// is not an error: the row's `changed_at` is updated instead.
    async fn save_new_info(&self, record: &ImageRecord) -> Result<()>;

    /// Rewrite `changed_at` for the row matching `record.filename`.
    ///
    /// Returns the identifier the row already held — the identifier is a
    /// stable per-filename handle and is never rewritten on overwrite.
    async fn update_info(&self, record: &ImageRecord) -> Result<String>;

    /// All rows in repository order (surrogate-key order).
    async fn get_all_info(&self) -> Result<Vec<ImageRecord>>;
}

/// Repository over a SQLite connection pool.
pub struct SqlImageRepository {
    pool: SqlitePool,
}

impl SqlImageRepository {
    /// Connect to `database_url` and apply the schema.
    ///
    /// Accepts `sqlite://path/to.db` or `sqlite::memory:`. In-memory
    /// databases are pinned to a single connection: each SQLite memory
    /// connection is its own database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::repository(format!("invalid database URL: {e}")))?
            .create_if_missing(true);

        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| Error::repository(format!("cannot connect to database: {e}")))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::repository(format!("cannot create images table: {e}")))?;

        debug!("metadata repository ready at {database_url}");

        Ok(Self { pool })
    }

    /// Build a repository from an existing pool. The schema must already
    /// be applied.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ImageRepository for SqlImageRepository {
    async fn save_new_info(&self, record: &ImageRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO images (image_id, filename, created_at, changed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(filename) DO UPDATE SET changed_at = excluded.changed_at",
        )
        .bind(&record.image_id)
        .bind(&record.filename)
        .bind(&record.created_at)
        .bind(&record.changed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::repository(format!("cannot save image info: {e}")))?;

        Ok(())
    }

    async fn update_info(&self, record: &ImageRecord) -> Result<String> {
        let row = sqlx::query(
            "UPDATE images SET changed_at = ?1 WHERE filename = ?2 RETURNING image_id",
        )
        .bind(&record.changed_at)
        .bind(&record.filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::repository(format!("cannot update image info: {e}")))?;

        match row {
            Some(row) => Ok(row.get("image_id")),
            None => Err(Error::RecordNotFound {
                filename: record.filename.clone(),
            }),
        }
    }

    async fn get_all_info(&self) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            "SELECT image_id, filename, created_at, changed_at FROM images ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::repository(format!("cannot read image info: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| ImageRecord {
                image_id: row.get("image_id"),
                filename: row.get("filename"),
                created_at: row.get("created_at"),
                changed_at: row.get("changed_at"),
            })
            .collect())
    }
}
