//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use earnings_core::{CacheKey, CandidateCache, CandidateDocument, EarningsError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument};

/// SQLite-based cache for candidate documents.
///
/// This cache stores each source's candidate list as a JSON row in a SQLite database
/// file, providing persistence across application restarts. Queries run on the
/// blocking pool through `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| EarningsError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EarningsError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| EarningsError::Cache(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| EarningsError::Cache(format!("Cache task failed: {e}")))?
    }

    fn count_param(key: &CacheKey) -> Result<i64> {
        i64::try_from(key.count)
            .map_err(|_| EarningsError::InvalidParameter(format!("count out of range: {}", key.count)))
    }
}

/// Initialize the database schema.
fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS candidate_cache (
            source TEXT NOT NULL,
            company TEXT NOT NULL,
            count INTEGER NOT NULL,
            doc_types TEXT NOT NULL,
            data_json TEXT NOT NULL,
            cached_at TEXT NOT NULL,
            PRIMARY KEY (source, company, count, doc_types)
        )",
        [],
    )
    .map_err(|e| EarningsError::Cache(e.to_string()))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_candidate_cached_at
         ON candidate_cache(cached_at)",
        [],
    )
    .map_err(|e| EarningsError::Cache(e.to_string()))?;

    debug!("SQLite cache schema initialized");
    Ok(())
}

#[async_trait]
impl CandidateCache for SqliteCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get_candidates(&self, key: &CacheKey) -> Result<Option<Vec<CandidateDocument>>> {
        let count = Self::count_param(key)?;
        let (source, company, filter) = (key.source.clone(), key.company.clone(), key.filter.clone());

        let result = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT data_json FROM candidate_cache
                     WHERE source = ?1 AND company = ?2 AND count = ?3 AND doc_types = ?4",
                    params![source, company, count, filter],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|e| EarningsError::Cache(e.to_string()))
            })
            .await?;

        match result {
            Some(json) => {
                let candidates: Vec<CandidateDocument> =
                    serde_json::from_str(&json).map_err(|e| EarningsError::Parse(e.to_string()))?;
                debug!(count = candidates.len(), "Found cached candidates");
                Ok(Some(candidates))
            }
            None => {
                debug!("No cached candidates found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, candidates), fields(key = %key, count = candidates.len()))]
    async fn put_candidates(&self, key: &CacheKey, candidates: &[CandidateDocument]) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let count = Self::count_param(key)?;
        let data_json =
            serde_json::to_string(candidates).map_err(|e| EarningsError::Parse(e.to_string()))?;
        let (source, company, filter) = (key.source.clone(), key.company.clone(), key.filter.clone());

        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO candidate_cache
                 (source, company, count, doc_types, data_json, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![source, company, count, filter, data_json, cached_at],
            )
            .map_err(|e| EarningsError::Cache(e.to_string()))
        })
        .await?;

        debug!("Cached {} candidates", candidates.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| EarningsError::Cache(format!("Invalid TTL duration: {e}")))?;
        let cutoff_str = cutoff.to_rfc3339_opts(SecondsFormat::Micros, true);

        let deleted = self
            .run(move |conn| {
                conn.execute(
                    "DELETE FROM candidate_cache WHERE cached_at < ?1",
                    params![cutoff_str],
                )
                .map_err(|e| EarningsError::Cache(e.to_string()))
            })
            .await?;

        if deleted > 0 {
            debug!("Invalidated {} stale cache entries", deleted);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.run(|conn| {
            conn.execute("DELETE FROM candidate_cache", [])
                .map_err(|e| EarningsError::Cache(e.to_string()))
        })
        .await?;

        debug!("Cleared all cache entries");
        Ok(())
    }
}
