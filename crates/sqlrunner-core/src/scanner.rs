use crate::errors::RunnerError;
use std::path::{Path, PathBuf};

pub const SCRIPT_SUFFIX: &str = ".sql";

/// Lists `.sql` files in the scripts directory, sorted lexicographically
/// by file name. Lexical order is the execution order for a batch, so
/// version numbers should be zero-padded where numeric ordering matters
/// (`V09` sorts before `V10`, but `V9` sorts after `V10`).
///
/// A missing directory is a configuration error, not an empty batch.
pub fn list_sql_files(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    if !dir.is_dir() {
        return Err(RunnerError::Config(format!(
            "scripts directory does not exist: {}",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| RunnerError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RunnerError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && entry.file_name().to_string_lossy().ends_with(SCRIPT_SUFFIX) {
            files.push(path);
        }
    }
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}
