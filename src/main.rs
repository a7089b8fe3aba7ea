//! Purpose: `statgather` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs commands, maps errors to exit codes.
//! Invariants: Report text goes to stdout (or `-o`); diagnostics and notices go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use statgather::api::{
    Error, ErrorKind, GatherStats, KeyOrder, ReadOptions, Report, ReportSummary, to_exit_code,
};
use statgather::notice::{Notice, notice_json};

const STDIN_PATH: &str = "-";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let options = ReadOptions {
        key_order: cli.key_order.into(),
    };

    command_dispatch::dispatch_command(cli.command, options, color_mode)
        .map_err(add_corrupt_hint)
        .map_err(add_mismatch_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "statgather",
    version,
    about = "Typed report tables: inspect, validate, and gather",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Reports are fixed-width text: one `#:GATKTable` block per table,
optionally preceded by a `#:GATKReport.v1.0:<n>` header.

Mental model:
  - workers each write a partial report
  - `gather` folds them together in argument order (last writer wins per cell)
"#,
    after_help = r#"EXAMPLES
  $ statgather gather shard-*.txt -o merged.txt
  $ statgather inspect merged.txt --table CountReads --rows
  $ statgather check merged.txt

LEARN MORE
  $ statgather <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        default_value = "sorted",
        value_enum,
        help = "Row order of parsed tables: sorted|insertion"
    )]
    key_order: KeyOrderCli,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KeyOrderCli {
    Sorted,
    Insertion,
}

impl From<KeyOrderCli> for KeyOrder {
    fn from(value: KeyOrderCli) -> Self {
        match value {
            KeyOrderCli::Sorted => KeyOrder::Sorted,
            KeyOrderCli::Insertion => KeyOrder::Insertion,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Merge reports into one",
        long_about = r#"Read every input report and gather them in argument order.

Tables with the same name must have the same columns, kinds, and formats.
Tables present in only some inputs are carried over as-is.
Cells present in more than one input take the value from the later input;
each input that overwrote cells produces one notice on stderr."#,
        after_help = r#"EXAMPLES
  $ statgather gather a.txt b.txt c.txt > merged.txt
  $ statgather gather shard-*.txt -o merged.txt
  $ cat shard-1.txt | statgather gather - shard-2.txt"#
    )]
    Gather {
        #[arg(
            help = "Input reports (`-` reads stdin)",
            required = true,
            num_args = 1..,
            value_hint = ValueHint::FilePath
        )]
        inputs: Vec<PathBuf>,
        #[arg(
            short,
            long,
            help = "Write the merged report here instead of stdout",
            value_hint = ValueHint::FilePath
        )]
        output: Option<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Re-emit a report in normalized form",
        after_help = r#"EXAMPLES
  $ statgather show report.txt
  $ statgather show report.txt --table CountReads"#
    )]
    Show {
        #[arg(help = "Input report (`-` reads stdin)", value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(long, help = "Emit only this table's block")]
        table: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Summarize a report as JSON",
        after_help = r#"EXAMPLES
  $ statgather inspect report.txt
  $ statgather inspect report.txt --table CountReads --rows"#
    )]
    Inspect {
        #[arg(help = "Input report (`-` reads stdin)", value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(long, help = "Summarize only this table")]
        table: Option<String>,
        #[arg(long, help = "Include every row's rendered cells")]
        rows: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Parse a report and report whether it is well-formed",
        long_about = r#"Parse a report without modifying it.

Prints a JSON receipt on success; exits nonzero with a located error otherwise."#,
        after_help = r#"EXAMPLES
  $ statgather check report.txt"#
    )]
    Check {
        #[arg(help = "Input report (`-` reads stdin)", value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ statgather version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ statgather completion bash > ~/.local/share/bash-completion/completions/statgather
  $ statgather completion zsh > ~/.zfunc/_statgather
  $ statgather completion fish > ~/.config/fish/completions/statgather.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN_PATH
}

fn load_report(path: &Path, options: ReadOptions) -> Result<Report, Error> {
    if is_stdin(path) {
        return Report::read_with_options(io::stdin().lock(), options)
            .map_err(|err| err.with_path(STDIN_PATH));
    }
    Report::load_with_options(path, options)
}

fn display_input(path: &Path) -> String {
    if is_stdin(path) {
        return "<stdin>".to_string();
    }
    path.display().to_string()
}

fn write_stdout(
    render: impl FnOnce(&mut BufWriter<io::StdoutLock<'static>>) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut out = BufWriter::new(io::stdout().lock());
    render(&mut out)?;
    out.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush stdout")
            .with_source(err)
    })
}

fn gather_reports(
    inputs: &[PathBuf],
    options: ReadOptions,
    color_mode: ColorMode,
) -> Result<(Report, GatherStats), Error> {
    if inputs.iter().filter(|path| is_stdin(path)).count() > 1 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("stdin (`-`) can be used as an input only once"));
    }
    let mut merged = Report::new();
    let mut total = GatherStats::default();
    for path in inputs {
        let report = load_report(path, options)?;
        let stats = merged
            .combine_with(&report)
            .map_err(|err| err.with_path(path))?;
        if stats.cells_overwritten > 0 {
            emit_notice(&overwrite_notice(path, stats), color_mode);
        }
        total.absorb(stats);
    }
    Ok((merged, total))
}

fn overwrite_notice(path: &Path, stats: GatherStats) -> Notice {
    let mut details = Map::new();
    details.insert("rows_added".to_string(), json!(stats.rows_added));
    details.insert("cells_copied".to_string(), json!(stats.cells_copied));
    details.insert(
        "cells_overwritten".to_string(),
        json!(stats.cells_overwritten),
    );
    Notice {
        kind: "overwrite".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: "gather".to_string(),
        report: display_input(path),
        message: format!(
            "{} cells overwritten by a later input",
            stats.cells_overwritten
        ),
        details,
    }
}

fn check_receipt(path: &Path, report: &Report) -> Value {
    json!({
        "ok": true,
        "path": display_input(path),
        "tables": report.len(),
        "rows": report.tables().map(|table| table.num_rows()).sum::<usize>(),
    })
}

fn summary_json(
    path: &Path,
    report: &Report,
    table: Option<&str>,
    rows: bool,
) -> Result<Value, Error> {
    let summary = match table {
        Some(name) => ReportSummary::from_tables(std::iter::once(report.get_table(name)?), rows),
        None => ReportSummary::from_tables(report.tables(), rows),
    };
    let summary = summary.with_path(Path::new(&display_input(path)));
    serde_json::to_value(&summary).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode summary")
            .with_source(err)
    })
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("statgather {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "statgather",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (report: {})", notice.message, notice.report);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
        ErrorKind::Invalid => "invalid value".to_string(),
        ErrorKind::Mismatch => "table formats differ".to_string(),
        ErrorKind::Unsupported => "unsupported operation".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!(
            "{} {offset}",
            colorize_label("offset:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("The report may be truncated or hand-edited; check the reported line.")
}

fn add_mismatch_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Mismatch || err.hint().is_some() {
        return err;
    }
    err.with_hint("Gather only reports produced by the same tool configuration.")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `statgather --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "statgather") else {
        return "Try `statgather --help`.".to_string();
    };

    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();

    if parts.is_empty() {
        return "Try `statgather --help`.".to_string();
    }
    format!("Try `statgather {} --help`.", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{Cli, add_corrupt_hint, error_json, error_text};
    use clap::{CommandFactory, Parser};
    use statgather::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gather_requires_an_input() {
        assert!(Cli::try_parse_from(["statgather", "gather"]).is_err());
        assert!(Cli::try_parse_from(["statgather", "gather", "a.txt", "-o", "out.txt"]).is_ok());
    }

    #[test]
    fn error_json_carries_location() {
        let err = Error::new(ErrorKind::Corrupt)
            .with_message("bad row")
            .with_path("r.txt")
            .with_line(7);
        let value = error_json(&add_corrupt_hint(err));
        let inner = value.get("error").expect("error object");
        assert_eq!(inner["kind"], "Corrupt");
        assert_eq!(inner["line"], 7);
        assert_eq!(inner["path"], "r.txt");
        assert!(inner.get("hint").is_some());
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::NotFound).with_message("missing table");
        let plain = error_text(&err, false);
        assert!(plain.starts_with("error: missing table"));
        let colored = error_text(&err, true);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
    }
}
