//! Persistent key-value storage for the content cache.
//!
//! The loader talks to the [`KvStore`] trait only. Two implementations ship:
//! - [`Storage`]: a libSQL database file (used by the CLI)
//! - [`MemoryStore`]: a process-local map (used by tests)
//!
//! **Access rules:**
//! - `render` / `content`: read-write via [`Storage::open`]
//! - `cache status`: read-only via [`Storage::open_readonly`]

mod memory;
mod migrations;

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use sheetbind_shared::{Result, SheetbindError};

pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Get/set string values by name.
///
/// Values are opaque strings; callers handle their own encoding.
pub trait KvStore {
    /// Read an entry. `Ok(None)` when the name was never written.
    fn get(&self, name: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Write an entry, replacing any previous value.
    fn set(&self, name: &str, value: &str) -> impl Future<Output = Result<()>>;

    /// Write several entries as one unit.
    ///
    /// The default writes them one by one; stores with transactions override it.
    fn set_all(&self, entries: &[(&str, &str)]) -> impl Future<Output = Result<()>> {
        async move {
            for (name, value) in entries {
                self.set(name, value).await?;
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// libSQL store
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SheetbindError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    SheetbindError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SheetbindError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Upsert one entry on the given connection (plain or transactional).
    async fn upsert(conn: &Connection, name: &str, value: &str, now: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO kv_store (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![name, value, now],
        )
        .await
        .map_err(|e| SheetbindError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl KvStore for Storage {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let mut rows = match self
            .conn
            .query("SELECT value FROM kv_store WHERE name = ?1", params![name])
            .await
        {
            Ok(rows) => rows,
            // A read-only handle on a fresh file has no schema yet
            Err(e) if self.readonly => {
                tracing::debug!(error = %e, "kv_store not readable, treating as empty");
                return Ok(None);
            }
            Err(e) => return Err(SheetbindError::Storage(e.to_string())),
        };

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| SheetbindError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SheetbindError::Storage(e.to_string())),
        }
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        Self::upsert(&self.conn, name, value, &now).await
    }

    async fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;

        for (name, value) in entries {
            // Dropping `tx` on error rolls the batch back
            Self::upsert(&tx, name, value, &now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| SheetbindError::Storage(e.to_string()))?;
        Ok(())
    }
}
