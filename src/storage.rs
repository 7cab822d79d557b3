use crate::error::{CauseListError, Result};
use crate::types::Watcher;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-source watermark persistence. Single writer: the batch runner.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_watermark(&self, source_id: &str) -> Result<Option<NaiveDate>>;
    async fn set_watermark(&self, source_id: &str, date: NaiveDate) -> Result<()>;
}

/// Case number → registered watchers. Read-only from the pipeline's side.
#[async_trait]
pub trait WatcherDirectory: Send + Sync {
    async fn find_watchers(&self, case_number: &str) -> Result<Vec<Watcher>>;
}

#[derive(Debug, Clone)]
pub struct SourceRow {
    pub source_id: String,
    pub display_name: String,
    pub last_list_date: Option<NaiveDate>,
}

/// SQLite-backed store for watermarks and watcher links.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;
            CREATE TABLE IF NOT EXISTS sources (
                source_id       TEXT PRIMARY KEY,
                display_name    TEXT NOT NULL,
                last_list_date  TEXT
            );
            CREATE TABLE IF NOT EXISTS watchers (
                watcher_id  INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS cases (
                case_id      INTEGER PRIMARY KEY AUTOINCREMENT,
                case_number  TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS watcher_cases (
                watcher_id  INTEGER NOT NULL REFERENCES watchers(watcher_id),
                case_id     INTEGER NOT NULL REFERENCES cases(case_id),
                PRIMARY KEY (watcher_id, case_id)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CauseListError::Lookup("database connection lock poisoned".into()))
    }

    pub fn register_source(&self, source_id: &str, display_name: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sources (source_id, display_name) VALUES (?1, ?2)
             ON CONFLICT(source_id) DO UPDATE SET display_name=excluded.display_name",
            params![source_id, display_name],
        )?;
        Ok(())
    }

    pub fn list_sources(&self) -> Result<Vec<SourceRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, display_name, last_list_date FROM sources ORDER BY source_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(source_id, display_name, date)| {
                Ok(SourceRow {
                    source_id,
                    display_name,
                    last_list_date: date.as_deref().map(parse_date).transpose()?,
                })
            })
            .collect()
    }

    pub fn clear_watermark(&self, source_id: &str) -> Result<()> {
        self.conn()?.execute(
            "UPDATE sources SET last_list_date = NULL WHERE source_id = ?1",
            params![source_id],
        )?;
        Ok(())
    }

    /// Register `name <email>` as watching `case_number`. Idempotent.
    pub fn add_watcher(&self, name: &str, email: &str, case_number: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO watchers (name, email) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET name=excluded.name",
            params![name, email],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO cases (case_number) VALUES (?1)",
            params![case_number],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO watcher_cases (watcher_id, case_id)
             SELECT w.watcher_id, c.case_id FROM watchers w, cases c
             WHERE w.email = ?1 AND c.case_number = ?2",
            params![email, case_number],
        )?;
        tx.commit()?;
        debug!("Linked watcher {} to case {}", email, case_number);
        Ok(())
    }

    /// All (case number, watcher) links, optionally for one case.
    pub fn list_watchers(&self, case_number: Option<&str>) -> Result<Vec<(String, Watcher)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.case_number, w.name, w.email
             FROM watcher_cases wc
             JOIN watchers w ON w.watcher_id = wc.watcher_id
             JOIN cases c ON c.case_id = wc.case_id
             WHERE ?1 IS NULL OR c.case_number = ?1
             ORDER BY c.case_number, w.email",
        )?;
        let rows = stmt
            .query_map(params![case_number], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Watcher {
                        name: row.get(1)?,
                        email: row.get(2)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?)
}

#[async_trait]
impl WatermarkStore for SqliteStore {
    async fn get_watermark(&self, source_id: &str) -> Result<Option<NaiveDate>> {
        let value: Option<Option<String>> = self
            .conn()?
            .query_row(
                "SELECT last_list_date FROM sources WHERE source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CauseListError::Lookup(e.to_string()))?;
        value.flatten().as_deref().map(parse_date).transpose()
    }

    async fn set_watermark(&self, source_id: &str, date: NaiveDate) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sources (source_id, display_name, last_list_date) VALUES (?1, ?1, ?2)
             ON CONFLICT(source_id) DO UPDATE SET last_list_date=excluded.last_list_date",
            params![source_id, date.format(DATE_FORMAT).to_string()],
        )?;
        debug!("Watermark for {} set to {}", source_id, date);
        Ok(())
    }
}

#[async_trait]
impl WatcherDirectory for SqliteStore {
    async fn find_watchers(&self, case_number: &str) -> Result<Vec<Watcher>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT w.name, w.email
                 FROM watchers w
                 JOIN watcher_cases wc ON w.watcher_id = wc.watcher_id
                 JOIN cases c ON wc.case_id = c.case_id
                 WHERE c.case_number = ?1",
            )
            .map_err(|e| CauseListError::Lookup(e.to_string()))?;
        let watchers = stmt
            .query_map(params![case_number], |row| {
                Ok(Watcher {
                    name: row.get(0)?,
                    email: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| CauseListError::Lookup(e.to_string()))?;
        Ok(watchers)
    }
}

/// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct InMemoryStorage {
    watermarks: Arc<Mutex<HashMap<String, NaiveDate>>>,
    watchers: Arc<Mutex<HashMap<String, BTreeSet<Watcher>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watcher(self, case_number: &str, name: &str, email: &str) -> Self {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers
                .entry(case_number.to_string())
                .or_default()
                .insert(Watcher {
                    name: name.to_string(),
                    email: email.to_string(),
                });
        }
        self
    }

    pub fn with_watermark(self, source_id: &str, date: NaiveDate) -> Self {
        if let Ok(mut marks) = self.watermarks.lock() {
            marks.insert(source_id.to_string(), date);
        }
        self
    }
}

#[async_trait]
impl WatermarkStore for InMemoryStorage {
    async fn get_watermark(&self, source_id: &str) -> Result<Option<NaiveDate>> {
        let marks = self
            .watermarks
            .lock()
            .map_err(|_| CauseListError::Lookup("watermark lock poisoned".into()))?;
        Ok(marks.get(source_id).copied())
    }

    async fn set_watermark(&self, source_id: &str, date: NaiveDate) -> Result<()> {
        let mut marks = self
            .watermarks
            .lock()
            .map_err(|_| CauseListError::Lookup("watermark lock poisoned".into()))?;
        marks.insert(source_id.to_string(), date);
        Ok(())
    }
}

#[async_trait]
impl WatcherDirectory for InMemoryStorage {
    async fn find_watchers(&self, case_number: &str) -> Result<Vec<Watcher>> {
        let watchers = self
            .watchers
            .lock()
            .map_err(|_| CauseListError::Lookup("watcher lock poisoned".into()))?;
        Ok(watchers
            .get(case_number)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
