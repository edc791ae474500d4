use crate::model::ScriptType;
use regex::Regex;
use std::sync::OnceLock;

/// Metadata derived from a script file name. Never persisted directly;
/// the history table stores the individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMeta {
    pub script_type: ScriptType,
    pub major_version: u32,
    pub minor_version: u32,
    pub logical_name: String,
    pub file_name: String,
}

// <ddl|dml>_V<major>.<minor>_<name>.sql, prefix case-insensitive.
fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^((?i:ddl|dml))_V(\d+)\.(\d+)_([A-Za-z0-9_]+)\.sql$").unwrap()
    })
}

impl ScriptMeta {
    /// Parses a file name into script metadata. `None` means the name
    /// does not follow the convention; callers skip such files rather
    /// than treat them as errors.
    pub fn parse(file_name: &str) -> Option<ScriptMeta> {
        let caps = name_pattern().captures(file_name)?;
        let script_type = if caps[1].eq_ignore_ascii_case("ddl") {
            ScriptType::Ddl
        } else {
            ScriptType::Dml
        };
        Some(ScriptMeta {
            script_type,
            major_version: caps[2].parse().ok()?,
            minor_version: caps[3].parse().ok()?,
            logical_name: caps[4].to_string(),
            file_name: file_name.to_string(),
        })
    }
}
