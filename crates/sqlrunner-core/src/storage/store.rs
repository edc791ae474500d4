use crate::errors::RunnerError;
use crate::model::{ScriptRecord, ScriptStatus, ScriptType};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RECORD_COLUMNS: &str = "id, script_name, script_type, major_version, minor_version, \
                              checksum, status, executed_at, error_message";

/// Handle on the database that holds script history, the lock row, and
/// the data the scripts themselves operate on. Clones share one
/// connection; cross-instance coordination goes through the lock row,
/// not this mutex.
#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, RunnerError> {
        let conn = Connection::open(path)?;
        // Several nodes share the file; wait out short write bursts
        // instead of surfacing SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self, RunnerError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<(), RunnerError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn find_by_name(&self, script_name: &str) -> Result<Option<ScriptRecord>, RunnerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM script_history WHERE script_name = ?1"
        ))?;
        let mut rows = stmt.query(params![script_name])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_record(row)?)),
            None => Ok(None),
        }
    }

    pub fn find_all(&self) -> Result<Vec<ScriptRecord>, RunnerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM script_history ORDER BY script_name"
        ))?;
        let rows = stmt.query_map([], map_record)?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    /// Creates the history row for a newly discovered script in PENDING
    /// state. The name is unique; inserting a duplicate is an error.
    pub fn insert_pending(
        &self,
        script_name: &str,
        script_type: ScriptType,
        major_version: u32,
        minor_version: u32,
        checksum: &str,
    ) -> Result<(), RunnerError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO script_history \
             (script_name, script_type, major_version, minor_version, checksum, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                script_name,
                script_type.as_str(),
                major_version,
                minor_version,
                checksum,
                ScriptStatus::Pending.as_str()
            ],
        )?;
        Ok(())
    }

    /// Overwrites the mutable fields of an existing history row.
    /// Callers hold the global lock for the duration of any batch of
    /// mutations; there is no optimistic concurrency here.
    pub fn update_status(
        &self,
        script_name: &str,
        checksum: &str,
        status: ScriptStatus,
        executed_at: Option<DateTime<Utc>>,
        error_message: Option<&str>,
    ) -> Result<(), RunnerError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE script_history \
             SET checksum = ?1, status = ?2, executed_at = ?3, error_message = ?4 \
             WHERE script_name = ?5",
            params![
                checksum,
                status.as_str(),
                executed_at,
                error_message,
                script_name
            ],
        )?;
        Ok(())
    }
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScriptRecord> {
    Ok(ScriptRecord {
        id: row.get(0)?,
        script_name: row.get(1)?,
        script_type: ScriptType::parse(&row.get::<_, String>(2)?),
        major_version: row.get(3)?,
        minor_version: row.get(4)?,
        checksum: row.get(5)?,
        status: ScriptStatus::parse(&row.get::<_, String>(6)?),
        executed_at: row.get(7)?,
        error_message: row.get(8)?,
    })
}
