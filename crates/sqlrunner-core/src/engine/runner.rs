use crate::checksum::sha256_hex;
use crate::engine::decision::{decide, Action};
use crate::engine::splitter::split_statements;
use crate::errors::RunnerError;
use crate::meta::ScriptMeta;
use crate::model::{ScriptRecord, ScriptStatus};
use crate::scanner::list_sql_files;
use crate::storage::{Store, GLOBAL_LOCK_NAME};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Orchestrates a batch: lock, scan, decide, execute, record.
///
/// All dependencies are passed in explicitly; a `Runner` owns no global
/// state and can be constructed per call.
pub struct Runner {
    store: Store,
    scripts_dir: PathBuf,
    node_id: String,
}

/// Per-batch outcome counts. `lock_acquired == false` means the whole
/// run was skipped because another node held the lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub lock_acquired: bool,
    pub executed: u32,
    pub skipped: u32,
    pub held: u32,
    pub marked_needs_rerun: u32,
    pub failed: u32,
}

impl Runner {
    pub fn new(store: Store, scripts_dir: PathBuf, node_id: String) -> Self {
        Self {
            store,
            scripts_dir,
            node_id,
        }
    }

    /// Applies every script in the directory, in lexical file-name
    /// order, under the global lock. If another node holds the lock the
    /// run is skipped silently: that node is presumed to be applying
    /// the same batch.
    ///
    /// A script whose statements fail is recorded FAILED and the batch
    /// moves on to the next script.
    pub fn run_all_scripts(&self) -> Result<RunReport, RunnerError> {
        let Some(_guard) = self.store.try_acquire_lock(GLOBAL_LOCK_NAME, &self.node_id)? else {
            tracing::info!(
                event = "lock_skipped",
                node = %self.node_id,
                "another node holds the script lock; skipping run"
            );
            return Ok(RunReport::default());
        };
        tracing::info!(event = "lock_acquired", node = %self.node_id);

        let mut report = RunReport {
            lock_acquired: true,
            ..RunReport::default()
        };

        for path in list_sql_files(&self.scripts_dir)? {
            let file_name = match path.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };
            let Some(meta) = ScriptMeta::parse(&file_name) else {
                tracing::info!(
                    event = "script_ignored",
                    file = %file_name,
                    "name does not match the script pattern"
                );
                continue;
            };

            let content = read_script(&path)?;
            let checksum = sha256_hex(&content);

            let action = match self.store.find_by_name(&file_name)? {
                None => {
                    tracing::info!(
                        event = "script_new",
                        file = %file_name,
                        kind = %meta.script_type.as_str(),
                    );
                    self.store.insert_pending(
                        &file_name,
                        meta.script_type,
                        meta.major_version,
                        meta.minor_version,
                        &checksum,
                    )?;
                    Action::Execute
                }
                Some(rec) => decide(meta.script_type, rec.status, checksum == rec.checksum),
            };

            match action {
                Action::Execute => match self.execute_and_update(&file_name, &content, &checksum) {
                    Ok(()) => report.executed += 1,
                    Err(RunnerError::ScriptFailed { script, message }) => {
                        // Already recorded FAILED; the rest of the
                        // batch still gets processed.
                        tracing::error!(event = "script_failed", file = %script, error = %message);
                        report.failed += 1;
                    }
                    Err(e) => return Err(e),
                },
                Action::Skip => {
                    tracing::info!(event = "script_unchanged", file = %file_name);
                    report.skipped += 1;
                }
                Action::MarkNeedsRerun => {
                    tracing::info!(
                        event = "ddl_drift",
                        file = %file_name,
                        "content changed after success; marking NEEDS_RERUN"
                    );
                    self.store.update_status(
                        &file_name,
                        &checksum,
                        ScriptStatus::NeedsRerun,
                        None,
                        None,
                    )?;
                    report.marked_needs_rerun += 1;
                }
                Action::Hold => {
                    tracing::info!(
                        event = "script_held",
                        file = %file_name,
                        "requires manual rerun"
                    );
                    report.held += 1;
                }
            }
        }

        tracing::info!(event = "lock_released", node = %self.node_id);
        Ok(report)
    }

    /// Executes one script unconditionally, bypassing the decision
    /// table. The caller asked for it by name, so a held lock is a
    /// retryable error here, not a silent skip, and a missing or
    /// badly named file is a configuration error.
    pub fn rerun_script(&self, script_name: &str) -> Result<(), RunnerError> {
        let Some(_guard) = self.store.try_acquire_lock(GLOBAL_LOCK_NAME, &self.node_id)? else {
            tracing::info!(
                event = "lock_skipped",
                node = %self.node_id,
                script = %script_name,
                "another node holds the script lock"
            );
            return Err(RunnerError::LockHeld);
        };
        tracing::info!(event = "lock_acquired", node = %self.node_id, script = %script_name);

        let path = self.scripts_dir.join(script_name);
        if !path.is_file() {
            return Err(RunnerError::Config(format!(
                "script not found: {}",
                path.display()
            )));
        }
        let Some(meta) = ScriptMeta::parse(script_name) else {
            return Err(RunnerError::Config(format!(
                "invalid script name pattern: {script_name}"
            )));
        };

        let content = read_script(&path)?;
        let checksum = sha256_hex(&content);

        match self.store.find_by_name(script_name)? {
            None => {
                tracing::info!(event = "rerun_new_record", script = %script_name);
                self.store.insert_pending(
                    script_name,
                    meta.script_type,
                    meta.major_version,
                    meta.minor_version,
                    &checksum,
                )?;
            }
            Some(rec) => {
                tracing::info!(
                    event = "rerun_existing",
                    script = %script_name,
                    status = %rec.status.as_str(),
                );
            }
        }

        self.execute_and_update(script_name, &content, &checksum)
    }

    pub fn list_history(&self) -> Result<Vec<ScriptRecord>, RunnerError> {
        self.store.find_all()
    }

    /// Runs the script in one transaction and records the outcome. The
    /// history update happens after the transaction has committed or
    /// rolled back, so a FAILED row survives the rollback.
    fn execute_and_update(
        &self,
        script_name: &str,
        content: &str,
        checksum: &str,
    ) -> Result<(), RunnerError> {
        match self.execute_transactional(content) {
            Ok(()) => {
                self.store.update_status(
                    script_name,
                    checksum,
                    ScriptStatus::Success,
                    Some(Utc::now()),
                    None,
                )?;
                tracing::info!(event = "script_applied", script = %script_name);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.store.update_status(
                    script_name,
                    checksum,
                    ScriptStatus::Failed,
                    Some(Utc::now()),
                    Some(&message),
                )?;
                Err(RunnerError::ScriptFailed {
                    script: script_name.to_string(),
                    message,
                })
            }
        }
    }

    /// Statements run sequentially on one connection; the first error
    /// aborts the script and the dropped transaction rolls everything
    /// back. Commit happens only after the last statement.
    fn execute_transactional(&self, content: &str) -> Result<(), rusqlite::Error> {
        let mut conn = self.store.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for statement in split_statements(content) {
            tx.execute_batch(&statement)?;
        }
        tx.commit()
    }
}

fn read_script(path: &Path) -> Result<String, RunnerError> {
    std::fs::read_to_string(path).map_err(|e| RunnerError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
