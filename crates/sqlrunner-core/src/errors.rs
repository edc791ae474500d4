use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the script runner.
///
/// Lock conflicts are modelled as values, not driver exceptions:
/// `run_all_scripts` never sees `LockHeld` (it skips silently), while
/// `rerun_script` raises it so the caller knows to retry later.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("another node holds the script lock; try again later")]
    LockHeld,

    /// A statement inside the script failed. The script's effects were
    /// rolled back and the history row already records FAILED.
    #[error("script {script} failed: {message}")]
    ScriptFailed { script: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RunnerResult<T> = Result<T, RunnerError>;
