//! Purpose: Hold top-level CLI command dispatch for `statgather`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Report text is written only after every input parsed and gathered cleanly.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

use statgather::api::write_table;

pub(super) fn dispatch_command(
    command: Command,
    options: ReadOptions,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "statgather", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Gather { inputs, output } => {
            let (merged, stats) = gather_reports(&inputs, options, color_mode)?;
            tracing::debug!(
                inputs = inputs.len(),
                tables = merged.len(),
                rows_added = stats.rows_added,
                cells_overwritten = stats.cells_overwritten,
                "gathered reports"
            );
            match output {
                Some(path) => merged.save(&path)?,
                None => write_stdout(|out| merged.write(out))?,
            }
            Ok(RunOutcome::ok())
        }
        Command::Show { input, table } => {
            let report = load_report(&input, options)?;
            match table {
                Some(name) => {
                    let table = report.get_table(&name).map_err(|err| err.with_path(&input))?;
                    write_stdout(|out| write_table(table, out))?;
                }
                None => write_stdout(|out| report.write(out))?,
            }
            Ok(RunOutcome::ok())
        }
        Command::Inspect { input, table, rows } => {
            let report = load_report(&input, options)?;
            let value = summary_json(&input, &report, table.as_deref(), rows)
                .map_err(|err| err.with_path(&input))?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Check { input } => {
            let report = load_report(&input, options)?;
            emit_json(check_receipt(&input, &report));
            Ok(RunOutcome::ok())
        }
    }
}
