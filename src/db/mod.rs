use crate::errors::{AppError, AppResult, StoreError, StoreResult};
use crate::models::NotesSettings;
use crate::store::{decode_records, RecordStore};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    quota_bytes: AtomicU64,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            quota_bytes: AtomicU64::new(NotesSettings::default().max_storage_bytes),
        };

        db.ensure_default_settings()?;
        let settings = db.get_settings()?;
        db.quota_bytes.store(settings.max_storage_bytes, Ordering::Relaxed);

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_settings(&self) -> AppResult<NotesSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<NotesSettings>(&raw).unwrap_or_else(|error| {
                tracing::warn!(error = %error, "stored settings unreadable; using defaults");
                NotesSettings::default()
            })),
            None => Ok(NotesSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<NotesSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: NotesSettings = serde_json::from_value(merged)?;

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;
        self.quota_bytes.store(settings.max_storage_bytes, Ordering::Relaxed);

        Ok(settings)
    }

    pub fn stored_bytes(&self) -> StoreResult<u64> {
        let conn = self.lock_records()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value_json AS BLOB))), 0) FROM records",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&NotesSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }

    fn lock_records(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("database mutex poisoned".to_string()))
    }
}

impl RecordStore for Database {
    fn get(&self, key: &str) -> StoreResult<Vec<serde_json::Value>> {
        let conn = self.lock_records()?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM records WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => decode_records(key, &raw),
            None => Ok(Vec::new()),
        }
    }

    fn set(&self, key: &str, records: &[serde_json::Value]) -> StoreResult<()> {
        let encoded = serde_json::to_string(records)?;
        let conn = self.lock_records()?;

        let others: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value_json AS BLOB))), 0) FROM records WHERE key != ?1",
            [key],
            |row| row.get(0),
        )?;
        let needed = others.max(0) as u64 + (key.len() + encoded.len()) as u64;
        let quota = self.quota_bytes.load(Ordering::Relaxed);
        if needed > quota {
            return Err(StoreError::StorageUnavailable(format!(
                "quota of {} bytes exceeded ({} needed)",
                quota, needed
            )));
        }

        conn.execute(
            "INSERT INTO records (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, encoded, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

pub(crate) fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
