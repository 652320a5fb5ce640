/*!
 * SQLite artifact backend.
 *
 * One shared connection behind a mutex; every call runs on tokio's blocking
 * pool so the async runtime never waits on disk I/O.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::schema;
use super::{ArtifactKey, ArtifactStore};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "artifacts.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "cuedub";

/// Artifacts as rows of one SQLite table
#[derive(Clone)]
pub struct SqliteArtifactStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteArtifactStore {
    /// Open (or create) the database at the default location
    pub fn open_default() -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::open(&db_path)
    }

    /// Open (or create) the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening artifact database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Creating in-memory artifact database");

        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/cuedub/artifacts.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with the connection on the blocking pool
    async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }
}

/// Primary-key columns of a key; missing indices become -1
fn key_columns(key: &ArtifactKey) -> (String, String, &'static str, i64, i64) {
    let (unit, chunk) = key.kind.indices();
    let index = |i: Option<usize>| i.map(|v| v as i64).unwrap_or(-1);
    (
        key.content_id.clone(),
        key.language.clone(),
        key.kind.tag(),
        index(unit),
        index(chunk),
    )
}

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn has(&self, key: &ArtifactKey) -> Result<bool> {
        let (content_id, language, kind, unit, chunk) = key_columns(key);
        self.execute_async(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM artifacts
                 WHERE content_id = ?1 AND language = ?2 AND kind = ?3 AND unit_index = ?4 AND chunk_index = ?5",
                params![content_id, language, kind, unit, chunk],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        let (content_id, language, kind, unit, chunk) = key_columns(key);
        self.execute_async(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM artifacts
                     WHERE content_id = ?1 AND language = ?2 AND kind = ?3 AND unit_index = ?4 AND chunk_index = ?5",
                    params![content_id, language, kind, unit, chunk],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(data)
        })
        .await
    }

    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        let (content_id, language, kind, unit, chunk) = key_columns(key);
        let data = bytes.to_vec();
        let now = chrono::Utc::now().to_rfc3339();
        self.execute_async(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO artifacts
                 (content_id, language, kind, unit_index, chunk_index, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![content_id, language, kind, unit, chunk, data, now],
            )
            .context("Failed to store artifact")?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &ArtifactKey) -> Result<bool> {
        let (content_id, language, kind, unit, chunk) = key_columns(key);
        self.execute_async(move |conn| {
            let removed = conn.execute(
                "DELETE FROM artifacts
                 WHERE content_id = ?1 AND language = ?2 AND kind = ?3 AND unit_index = ?4 AND chunk_index = ?5",
                params![content_id, language, kind, unit, chunk],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}
