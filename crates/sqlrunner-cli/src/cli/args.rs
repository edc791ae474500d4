use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlrunner",
    version,
    about = "Applies versioned SQL scripts with checksum tracking and cross-node locking"
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding <ddl|dml>_V<major>.<minor>_<name>.sql scripts
    #[arg(long, env = "SCRIPTS_DIR", default_value = "./scripts", global = true)]
    pub scripts_dir: PathBuf,

    /// Database holding script history, the lock row, and the data the
    /// scripts operate on
    #[arg(
        long,
        env = "SQLRUNNER_DB",
        default_value = ".sqlrunner/app.db",
        global = true
    )]
    pub db: PathBuf,

    /// Logical node id recorded on the lock row (map to HOSTNAME in k8s)
    #[arg(long, env = "NODE_ID", default_value = "local-node", global = true)]
    pub node_id: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply all pending or changed scripts in lexical file-name order
    Run,
    /// Re-execute one script unconditionally, whatever its status
    Rerun(RerunArgs),
    /// Show the per-script execution history
    History(HistoryArgs),
    /// Create the schema and the scripts directory
    Init,
    /// Clear a lock row left behind by a crashed node
    Unlock,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RerunArgs {
    /// Script file name, e.g. dml_V1.1_seed.sql
    pub script: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub format: String,
}
