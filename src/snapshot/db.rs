//! SQLite reward sink
//!
//! Table (created if missing):
//! ```sql
//! CREATE TABLE IF NOT EXISTS <table> (
//!     stake       TEXT PRIMARY KEY,
//!     reward      REAL NOT NULL,
//!     updated_at  INTEGER NOT NULL
//! )
//! ```
//!
//! `replace_all` deletes and re-inserts inside one transaction, so a failed
//! publish leaves the previous snapshot's rows in place instead of an empty
//! table.

use super::error::{Result, SnapshotError};
use super::publisher::{RewardRow, RewardSink};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteRewardSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRewardSink {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SnapshotError::PersistenceFailure(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("SQLite journal mode: {}", mode);

        log::info!("✅ SQLite reward sink opened: {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SnapshotError::PersistenceFailure("connection lock poisoned".to_string()))
    }

    pub fn ensure_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        let conn = self.lock()?;
        create_table(&conn, table)
    }

    /// Read back every row, sorted by stake
    pub fn load_rewards(&self, table: &str) -> Result<Vec<RewardRow>> {
        validate_table_name(table)?;
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!("SELECT stake, reward FROM {} ORDER BY stake", table))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RewardRow {
                    stake: row.get(0)?,
                    reward: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

#[async_trait]
impl RewardSink for SqliteRewardSink {
    async fn replace_all(&self, table: &str, rows: &[RewardRow]) -> Result<usize> {
        validate_table_name(table)?;
        let mut conn = self.lock()?;
        create_table(&conn, table)?;

        let now = chrono::Utc::now().timestamp();
        let tx = conn.transaction()?;

        let deleted = tx.execute(&format!("DELETE FROM {}", table), [])?;
        log::debug!("Dropped {} previous rows from {}", deleted, table);

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (stake, reward, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(stake) DO UPDATE SET
                     reward = excluded.reward,
                     updated_at = excluded.updated_at",
                table
            ))?;
            for row in rows {
                stmt.execute(params![row.stake, row.reward, now])?;
            }
        }

        tx.commit()?;

        Ok(rows.len())
    }

    fn sink_type(&self) -> &'static str {
        "SQLite"
    }
}

fn create_table(conn: &Connection, table: &str) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                stake       TEXT PRIMARY KEY,
                reward      REAL NOT NULL,
                updated_at  INTEGER NOT NULL
            )",
            table
        ),
        [],
    )?;
    Ok(())
}

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SnapshotError::InvalidConfig(format!(
            "invalid table name '{}'",
            table
        )))
    }
}
