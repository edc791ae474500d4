pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS script_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  script_name TEXT NOT NULL UNIQUE,
  script_type TEXT NOT NULL,
  major_version INTEGER NOT NULL,
  minor_version INTEGER NOT NULL,
  checksum TEXT NOT NULL,
  status TEXT NOT NULL,
  executed_at TEXT,
  error_message TEXT
);

CREATE TABLE IF NOT EXISTS script_lock (
  lock_name TEXT PRIMARY KEY,
  locked_by TEXT NOT NULL,
  locked_at TEXT NOT NULL
);
"#;
