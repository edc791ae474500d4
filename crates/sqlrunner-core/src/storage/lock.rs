use crate::errors::RunnerError;
use crate::storage::store::Store;
use rusqlite::params;

/// Single lock name shared by every instance: whole-batch coordination,
/// not per-script locking.
pub const GLOBAL_LOCK_NAME: &str = "GLOBAL_SCRIPT_RUN";

/// Holds the lock row for as long as the guard lives. Dropping it
/// deletes the row, so the lock is released on every exit path of a
/// batch, including early returns and propagated errors.
///
/// There is no expiry or heartbeat: if the process dies while a guard
/// is live, the row stays behind until an operator clears it
/// (`Store::force_unlock`).
pub struct LockGuard {
    store: Store,
    lock_name: String,
    owner: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.store.release_lock(&self.lock_name, &self.owner) {
            tracing::warn!(
                event = "lock_release_failed",
                lock = %self.lock_name,
                owner = %self.owner,
                error = %e,
            );
        }
    }
}

impl Store {
    /// Single non-blocking attempt to take the named lock. `None` means
    /// another owner holds it; the caller decides whether that is a
    /// silent skip or a retryable error.
    ///
    /// `INSERT OR IGNORE` keyed on `lock_name` keeps conflict detection
    /// an explicit row count instead of a driver-specific constraint
    /// error.
    pub fn try_acquire_lock(
        &self,
        lock_name: &str,
        owner: &str,
    ) -> Result<Option<LockGuard>, RunnerError> {
        let inserted = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR IGNORE INTO script_lock (lock_name, locked_by, locked_at) \
                 VALUES (?1, ?2, ?3)",
                params![lock_name, owner, chrono::Utc::now()],
            )?
        };
        if inserted == 1 {
            Ok(Some(LockGuard {
                store: self.clone(),
                lock_name: lock_name.to_string(),
                owner: owner.to_string(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Deletes the lock row only when both name and owner match. An
    /// absent row, or one held by a different owner, is left untouched
    /// and is not an error.
    pub fn release_lock(&self, lock_name: &str, owner: &str) -> Result<(), RunnerError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM script_lock WHERE lock_name = ?1 AND locked_by = ?2",
            params![lock_name, owner],
        )?;
        Ok(())
    }

    /// Operator escape hatch for a lock left behind by a crashed
    /// holder. Removes the row regardless of owner; returns whether a
    /// row existed.
    pub fn force_unlock(&self, lock_name: &str) -> Result<bool, RunnerError> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM script_lock WHERE lock_name = ?1",
            params![lock_name],
        )?;
        Ok(n > 0)
    }
}
