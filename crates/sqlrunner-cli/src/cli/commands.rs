use super::args::{Cli, Command, CommonArgs, HistoryArgs, RerunArgs};
use sqlrunner_core::engine::Runner;
use sqlrunner_core::errors::RunnerError;
use sqlrunner_core::storage::{Store, GLOBAL_LOCK_NAME};

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const SCRIPT_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const LOCK_HELD: i32 = 3;
}

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run => cmd_run(&cli.common),
        Command::Rerun(args) => cmd_rerun(&cli.common, &args),
        Command::History(args) => cmd_history(&cli.common, &args),
        Command::Init => cmd_init(&cli.common),
        Command::Unlock => cmd_unlock(&cli.common),
    }
}

fn open_store(common: &CommonArgs) -> anyhow::Result<Store> {
    if let Some(parent) = common.db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = Store::open(&common.db)?;
    store.init_schema()?;
    Ok(store)
}

fn build_runner(common: &CommonArgs) -> anyhow::Result<Runner> {
    let store = open_store(common)?;
    Ok(Runner::new(
        store,
        common.scripts_dir.clone(),
        common.node_id.clone(),
    ))
}

fn cmd_run(common: &CommonArgs) -> anyhow::Result<i32> {
    let runner = build_runner(common)?;
    match runner.run_all_scripts() {
        Ok(report) => {
            if !report.lock_acquired {
                println!("skipped: another node is running scripts");
                return Ok(exit_codes::OK);
            }
            println!(
                "executed {} | skipped {} | held {} | needs_rerun {} | failed {}",
                report.executed,
                report.skipped,
                report.held,
                report.marked_needs_rerun,
                report.failed
            );
            if report.failed > 0 {
                Ok(exit_codes::SCRIPT_FAILED)
            } else {
                Ok(exit_codes::OK)
            }
        }
        Err(RunnerError::Config(msg)) => {
            eprintln!("config error: {msg}");
            Ok(exit_codes::CONFIG_ERROR)
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_rerun(common: &CommonArgs, args: &RerunArgs) -> anyhow::Result<i32> {
    let runner = build_runner(common)?;
    match runner.rerun_script(&args.script) {
        Ok(()) => {
            println!("rerun completed for {}", args.script);
            Ok(exit_codes::OK)
        }
        Err(RunnerError::LockHeld) => {
            eprintln!("another node is running scripts; try again later");
            Ok(exit_codes::LOCK_HELD)
        }
        Err(RunnerError::Config(msg)) => {
            eprintln!("config error: {msg}");
            Ok(exit_codes::CONFIG_ERROR)
        }
        Err(RunnerError::ScriptFailed { script, message }) => {
            eprintln!("script {script} failed: {message}");
            Ok(exit_codes::SCRIPT_FAILED)
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_history(common: &CommonArgs, args: &HistoryArgs) -> anyhow::Result<i32> {
    let runner = build_runner(common)?;
    let records = runner.list_history()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(exit_codes::OK);
    }

    if records.is_empty() {
        println!("no scripts recorded yet");
        return Ok(exit_codes::OK);
    }
    for r in &records {
        let executed_at = r
            .executed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<44} {:<4} {:<12} {}",
            r.script_name,
            r.script_type.as_str(),
            r.status.as_str(),
            executed_at
        );
        if let Some(err) = &r.error_message {
            println!("    error: {err}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_init(common: &CommonArgs) -> anyhow::Result<i32> {
    open_store(common)?;
    std::fs::create_dir_all(&common.scripts_dir)?;
    println!(
        "initialized schema in {} and scripts directory {}",
        common.db.display(),
        common.scripts_dir.display()
    );
    Ok(exit_codes::OK)
}

fn cmd_unlock(common: &CommonArgs) -> anyhow::Result<i32> {
    let store = open_store(common)?;
    if store.force_unlock(GLOBAL_LOCK_NAME)? {
        println!("lock cleared");
    } else {
        println!("no lock held");
    }
    Ok(exit_codes::OK)
}
