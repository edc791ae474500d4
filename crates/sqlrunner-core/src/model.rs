use chrono::{DateTime, Utc};
use serde::Serialize;

/// Risk class of a script, derived from its file name prefix.
///
/// DDL (structural changes) is treated as non-idempotent: once applied,
/// drift flags the script for a manual rerun instead of reapplying it.
/// DML (data changes) is reapplied automatically whenever its content
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScriptType {
    Ddl,
    Dml,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::Ddl => "DDL",
            ScriptType::Dml => "DML",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "DML" => ScriptType::Dml,
            // Unknown stored values get the conservative policy.
            _ => ScriptType::Ddl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptStatus {
    Pending,
    Success,
    Failed,
    NeedsRerun,
}

impl ScriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStatus::Pending => "PENDING",
            ScriptStatus::Success => "SUCCESS",
            ScriptStatus::Failed => "FAILED",
            ScriptStatus::NeedsRerun => "NEEDS_RERUN",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => ScriptStatus::Pending,
            "SUCCESS" => ScriptStatus::Success,
            "FAILED" => ScriptStatus::Failed,
            "NEEDS_RERUN" => ScriptStatus::NeedsRerun,
            // Unknown stored values are held, never silently re-run.
            _ => ScriptStatus::Failed,
        }
    }
}

/// One row of `script_history`; the script file name is the natural key.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptRecord {
    pub id: i64,
    pub script_name: String,
    pub script_type: ScriptType,
    pub major_version: u32,
    pub minor_version: u32,
    pub checksum: String,
    pub status: ScriptStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}
