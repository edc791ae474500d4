use crate::model::{ScriptStatus, ScriptType};

/// What the runner does with a script that already has a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the script in a transaction and record the outcome.
    Execute,
    /// The recorded state already covers the current file content.
    Skip,
    /// An applied DDL script drifted: flag it for a manual rerun
    /// without executing anything.
    MarkNeedsRerun,
    /// Leave the record untouched; an operator has to step in.
    Hold,
}

/// Re-execution policy, keyed on risk class, recorded status, and
/// whether the stored checksum still matches the file.
///
/// DDL is non-idempotent: drift after a recorded success is flagged,
/// failures are held for a human. DML is assumed safe to reapply and
/// re-executes whenever its content changes.
pub fn decide(
    script_type: ScriptType,
    status: ScriptStatus,
    checksum_unchanged: bool,
) -> Action {
    use crate::model::ScriptStatus::*;
    use crate::model::ScriptType::*;

    match (script_type, status, checksum_unchanged) {
        (_, Pending, _) => Action::Execute,

        (Ddl, Success, true) => Action::Skip,
        (Ddl, Success, false) => Action::MarkNeedsRerun,
        (Ddl, Failed | NeedsRerun, _) => Action::Hold,

        (Dml, Success, true) => Action::Skip,
        (Dml, Success, false) => Action::Execute,
        (Dml, Failed | NeedsRerun, true) => Action::Hold,
        (Dml, Failed | NeedsRerun, false) => Action::Execute,
    }
}
