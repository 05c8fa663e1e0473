use crate::session::PersistenceSlot;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Client-local string storage: one row per key
pub struct Database {
    conn: Mutex<Connection>,
}

/// `$HOME/.sewerking/sewerking.db`, creating the directory if needed
pub fn default_db_path() -> std::io::Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME is not set"))?;
    let dir = home.join(".sewerking");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("sewerking.db"))
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            -- String-keyed slots (chat history, config)
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        // Migration: early builds stored history without a timestamp column
        let has_updated_at: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('local_storage') WHERE name='updated_at'",
            [],
            |row| Ok(row.get::<_, i64>(0)? > 0),
        )?;
        if !has_updated_at {
            conn.execute(
                "ALTER TABLE local_storage ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''",
                [],
            )?;
        }

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }
}

impl PersistenceSlot for Database {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, Box<dyn Error + Send + Sync>> {
        Ok(self.get_item(key)?)
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
        Ok(self.set_item(key, value)?)
    }
}
