use sqlrunner_core::engine::Runner;
use sqlrunner_core::errors::RunnerError;
use sqlrunner_core::model::ScriptStatus;
use sqlrunner_core::storage::{Store, GLOBAL_LOCK_NAME};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    scripts: PathBuf,
    db: PathBuf,
    store: Store,
    runner: Runner,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let scripts = dir.path().join("scripts");
    std::fs::create_dir_all(&scripts).unwrap();
    let db = dir.path().join("app.db");

    let store = Store::open(&db).unwrap();
    store.init_schema().unwrap();
    let runner = Runner::new(store.clone(), scripts.clone(), "node-test".to_string());

    Fixture {
        _dir: dir,
        scripts,
        db,
        store,
        runner,
    }
}

fn write_script(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn count(db: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn end_to_end_batch_is_idempotent() {
    let f = fixture();
    write_script(
        &f.scripts,
        "ddl_V1.0_create_table.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    );
    write_script(
        &f.scripts,
        "dml_V1.1_seed.sql",
        "INSERT INTO users (name) VALUES ('ada');",
    );

    // First run: both scripts are new, both execute.
    let report = f.runner.run_all_scripts().unwrap();
    assert!(report.lock_acquired);
    assert_eq!(report.executed, 2);
    assert_eq!(report.failed, 0);

    let history = f.runner.list_history().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.status == ScriptStatus::Success));
    assert!(history.iter().all(|r| r.executed_at.is_some()));
    assert_eq!(count(&f.db, "users"), 1);

    let ddl_executed_at = history[0].executed_at;

    // Second run with unchanged files: nothing executes.
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(count(&f.db, "users"), 1);

    // Editing the DML script re-executes only that script.
    write_script(
        &f.scripts,
        "dml_V1.1_seed.sql",
        "INSERT INTO users (name) VALUES ('ada');\nINSERT INTO users (name) VALUES ('grace');",
    );
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(count(&f.db, "users"), 3);

    // The DDL record is untouched by the third run.
    let ddl = f
        .store
        .find_by_name("ddl_V1.0_create_table.sql")
        .unwrap()
        .unwrap();
    assert_eq!(ddl.status, ScriptStatus::Success);
    assert_eq!(ddl.executed_at, ddl_executed_at);
}

#[test]
fn ddl_drift_is_flagged_without_execution() {
    let f = fixture();
    write_script(
        &f.scripts,
        "ddl_V1.0_create_users.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY);",
    );
    f.runner.run_all_scripts().unwrap();

    // Drift: the applied DDL gains an ALTER that must not run.
    write_script(
        &f.scripts,
        "ddl_V1.0_create_users.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY);\nALTER TABLE users ADD COLUMN email TEXT;",
    );
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.marked_needs_rerun, 1);
    assert_eq!(report.executed, 0);

    let rec = f
        .store
        .find_by_name("ddl_V1.0_create_users.sql")
        .unwrap()
        .unwrap();
    assert_eq!(rec.status, ScriptStatus::NeedsRerun);
    // The record tracks the drifted content but execution is cleared.
    assert!(rec.executed_at.is_none());

    let conn = rusqlite::Connection::open(&f.db).unwrap();
    let cols: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'email'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(cols, 0, "ALTER must not have executed");

    // Flagged DDL is held on later runs until a manual rerun.
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.held, 1);
    assert_eq!(report.executed, 0);
}

#[test]
fn failed_dml_reruns_after_content_change() {
    let f = fixture();
    write_script(
        &f.scripts,
        "ddl_V1.0_create_users.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    );
    write_script(
        &f.scripts,
        "dml_V1.1_seed.sql",
        "INSERT INTO missing_table (name) VALUES ('ada');",
    );

    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.executed, 1); // the DDL
    assert_eq!(report.failed, 1);

    let rec = f.store.find_by_name("dml_V1.1_seed.sql").unwrap().unwrap();
    assert_eq!(rec.status, ScriptStatus::Failed);
    assert!(rec.error_message.is_some());

    // Unchanged failed DML is held, not retried.
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.held, 1);
    assert_eq!(report.executed, 0);

    // Fixing the content triggers an automatic retry.
    write_script(
        &f.scripts,
        "dml_V1.1_seed.sql",
        "INSERT INTO users (name) VALUES ('ada');",
    );
    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.failed, 0);

    let rec = f.store.find_by_name("dml_V1.1_seed.sql").unwrap().unwrap();
    assert_eq!(rec.status, ScriptStatus::Success);
    assert!(rec.executed_at.is_some());
    assert!(rec.error_message.is_none());
    assert_eq!(count(&f.db, "users"), 1);
}

#[test]
fn mid_script_failure_rolls_back_everything() {
    let f = fixture();
    {
        let conn = rusqlite::Connection::open(&f.db).unwrap();
        conn.execute("CREATE TABLE t (n INTEGER)", []).unwrap();
    }
    write_script(
        &f.scripts,
        "dml_V1.0_three_steps.sql",
        "INSERT INTO t (n) VALUES (1);\nINSERT INTO nope (n) VALUES (2);\nINSERT INTO t (n) VALUES (3);",
    );

    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.failed, 1);

    // Statement 1 rolled back, statement 3 never ran.
    assert_eq!(count(&f.db, "t"), 0);

    let rec = f
        .store
        .find_by_name("dml_V1.0_three_steps.sql")
        .unwrap()
        .unwrap();
    assert_eq!(rec.status, ScriptStatus::Failed);
    let msg = rec.error_message.expect("driver message captured");
    assert!(msg.contains("nope"), "unexpected message: {msg}");
}

#[test]
fn rerun_executes_unconditionally() {
    let f = fixture();
    write_script(
        &f.scripts,
        "ddl_V1.0_create_users.sql",
        "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY);",
    );
    f.runner.run_all_scripts().unwrap();

    let before = f
        .store
        .find_by_name("ddl_V1.0_create_users.sql")
        .unwrap()
        .unwrap();
    assert_eq!(before.status, ScriptStatus::Success);

    std::thread::sleep(std::time::Duration::from_millis(10));

    // Same content, same checksum, already SUCCESS: still executes.
    f.runner.rerun_script("ddl_V1.0_create_users.sql").unwrap();

    let after = f
        .store
        .find_by_name("ddl_V1.0_create_users.sql")
        .unwrap()
        .unwrap();
    assert_eq!(after.status, ScriptStatus::Success);
    assert!(after.executed_at.unwrap() > before.executed_at.unwrap());
}

#[test]
fn rerun_of_unknown_script_inserts_a_record_first() {
    let f = fixture();
    write_script(
        &f.scripts,
        "dml_V1.0_seed.sql",
        "CREATE TABLE IF NOT EXISTS kv (k TEXT); INSERT INTO kv (k) VALUES ('x');",
    );

    f.runner.rerun_script("dml_V1.0_seed.sql").unwrap();

    let rec = f.store.find_by_name("dml_V1.0_seed.sql").unwrap().unwrap();
    assert_eq!(rec.status, ScriptStatus::Success);
    assert_eq!(count(&f.db, "kv"), 1);
}

#[test]
fn rerun_signals_config_errors() {
    let f = fixture();

    let err = f.runner.rerun_script("dml_V1.0_missing.sql").unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)), "got {err:?}");

    write_script(&f.scripts, "notes.sql", "SELECT 1;");
    let err = f.runner.rerun_script("notes.sql").unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)), "got {err:?}");
}

#[test]
fn rerun_failure_is_reraised_after_recording() {
    let f = fixture();
    write_script(
        &f.scripts,
        "dml_V1.0_bad.sql",
        "INSERT INTO absent (n) VALUES (1);",
    );

    let err = f.runner.rerun_script("dml_V1.0_bad.sql").unwrap_err();
    assert!(
        matches!(err, RunnerError::ScriptFailed { .. }),
        "got {err:?}"
    );

    let rec = f.store.find_by_name("dml_V1.0_bad.sql").unwrap().unwrap();
    assert_eq!(rec.status, ScriptStatus::Failed);

    // The lock was released on the error path.
    assert!(f
        .store
        .try_acquire_lock(GLOBAL_LOCK_NAME, "node-test")
        .unwrap()
        .is_some());
}

#[test]
fn lock_contention_skips_batch_and_rejects_rerun() {
    let f = fixture();
    write_script(&f.scripts, "dml_V1.0_seed.sql", "SELECT 1;");

    let other = Store::open(&f.db).unwrap();
    let guard = other
        .try_acquire_lock(GLOBAL_LOCK_NAME, "other-node")
        .unwrap()
        .expect("foreign lock");

    // Batch run: silent skip.
    let report = f.runner.run_all_scripts().unwrap();
    assert!(!report.lock_acquired);
    assert_eq!(report.executed, 0);
    assert!(f.runner.list_history().unwrap().is_empty());

    // Targeted rerun: explicit retryable error.
    let err = f.runner.rerun_script("dml_V1.0_seed.sql").unwrap_err();
    assert!(matches!(err, RunnerError::LockHeld), "got {err:?}");

    drop(guard);
    let report = f.runner.run_all_scripts().unwrap();
    assert!(report.lock_acquired);
}

#[test]
fn non_matching_file_names_are_ignored() {
    let f = fixture();
    write_script(&f.scripts, "helpers.sql", "CREATE TABLE junk (n INTEGER);");
    write_script(
        &f.scripts,
        "ddl_V1.0_create_users.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY);",
    );

    let report = f.runner.run_all_scripts().unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(f.runner.list_history().unwrap().len(), 1);
}

#[test]
fn missing_scripts_directory_is_config_error_and_releases_lock() {
    let f = fixture();
    let runner = Runner::new(
        f.store.clone(),
        f.scripts.join("does_not_exist"),
        "node-test".to_string(),
    );

    let err = runner.run_all_scripts().unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)), "got {err:?}");

    // Guard released despite the early error.
    assert!(f
        .store
        .try_acquire_lock(GLOBAL_LOCK_NAME, "node-test")
        .unwrap()
        .is_some());
}
