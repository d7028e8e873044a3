//! dutysync - reconcile a declarative on-call rotation against a schedule service.
//!
//! Usage:
//!   dutysync validate <DOC>                              Check a rotation document
//!   dutysync expand <DOC> --from <T> --days <N>          Print the desired assignments
//!   dutysync reconcile <DOC> --schedule <ID> --state <FILE> --from <T> --days <N>
//!                                                        Bring the stored schedule in line

mod state;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dutysync_engine::{
    expand, format_duration, on_call_totals, reconcile, AssignmentInterval, OpOutcome,
    ReconcileOptions, ReconcileOutcome, ScheduleSpec, Window,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// dutysync - declarative on-call schedule reconciliation
#[derive(Parser)]
#[command(name = "dutysync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a rotation document
    Validate {
        /// Path to the rotation YAML document
        #[arg(value_name = "DOC")]
        document: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the assignment intervals a document produces over a window
    Expand {
        #[arg(value_name = "DOC")]
        document: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Reconcile a stored schedule with a document
    Reconcile {
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Remote schedule identifier
        #[arg(short, long)]
        schedule: String,

        /// JSON file holding the remote schedule state (created if absent)
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        /// Report the operations without applying them
        #[arg(long)]
        dry_run: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    from: DateTime<Utc>,

    /// Window end (RFC 3339)
    #[arg(
        long,
        value_parser = parse_instant,
        conflicts_with = "days",
        required_unless_present = "days"
    )]
    to: Option<DateTime<Utc>>,

    /// Window length in days from --from
    #[arg(long)]
    days: Option<i64>,
}

impl WindowArgs {
    fn window(&self) -> Result<Window> {
        let to = match (self.to, self.days) {
            (Some(to), _) => to,
            (None, Some(days)) => Duration::try_days(days)
                .and_then(|d| self.from.checked_add_signed(d))
                .with_context(|| format!("--days {days} is out of range"))?,
            (None, None) => anyhow::bail!("one of --to or --days is required"),
        };
        Ok(Window::new(self.from, to)?)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Validate { document, format } => {
            validate(&document, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Expand {
            document,
            window,
            format,
        } => {
            expand_document(&document, &window.window()?, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reconcile {
            document,
            schedule,
            state,
            window,
            dry_run,
            format,
        } => reconcile_document(&document, &schedule, &state, &window.window()?, dry_run, format),
    }
}

fn load_spec(path: &Path) -> Result<ScheduleSpec> {
    ScheduleSpec::from_path(path).with_context(|| format!("invalid document {}", path.display()))
}

fn validate(path: &Path, format: Format) -> Result<()> {
    let spec = load_spec(path)?;
    match format {
        Format::Json => {
            let summary = serde_json::json!({
                "name": spec.name(),
                "time_zone": spec.time_zone().name(),
                "layers": spec.layers().len(),
                "overrides": spec.overrides().len(),
                "participants": spec.participants(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Format::Text => {
            println!(
                "{}: valid ({} layers, {} overrides, time zone {})",
                spec.name(),
                spec.layers().len(),
                spec.overrides().len(),
                spec.time_zone().name()
            );
            println!("participants: {}", spec.participants().join(", "));
        }
    }
    Ok(())
}

fn expand_document(path: &Path, window: &Window, format: Format) -> Result<()> {
    let spec = load_spec(path)?;
    let intervals = expand(&spec, window);
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&intervals)?),
        Format::Text => {
            print_intervals(&intervals);
            println!();
            println!("on-call totals:");
            for (assignee, total) in on_call_totals(&intervals) {
                println!("  {assignee:<16} {}", format_duration(total));
            }
        }
    }
    Ok(())
}

fn print_intervals(intervals: &[AssignmentInterval]) {
    for iv in intervals {
        println!(
            "{}  {}  {}",
            iv.start.to_rfc3339(),
            iv.end.to_rfc3339(),
            iv.assignee
        );
    }
}

fn reconcile_document(
    path: &Path,
    schedule_id: &str,
    state_path: &Path,
    window: &Window,
    dry_run: bool,
    format: Format,
) -> Result<ExitCode> {
    let spec = load_spec(path)?;
    let mut remote = state::load(state_path)?;

    let options = ReconcileOptions {
        dry_run,
        ..Default::default()
    };
    let outcome = reconcile(&spec, &mut remote, schedule_id, *window, &options)
        .with_context(|| format!("reconciliation of schedule {schedule_id} aborted"))?;

    if !dry_run {
        state::save(state_path, &remote)?;
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Format::Text => print_outcome(&outcome),
    }

    let report = &outcome.report;
    if report.has_failures() || report.was_cancelled() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_outcome(outcome: &ReconcileOutcome) {
    println!("schedule {} over {}", outcome.schedule_id, outcome.window);
    if outcome.effective_window != outcome.window {
        println!("  widened to {}", outcome.effective_window);
    }
    if outcome.in_sync() {
        println!("already in sync");
        return;
    }
    for record in &outcome.report.records {
        let status = match &record.outcome {
            OpOutcome::Applied { .. } => "ok",
            OpOutcome::Failed { .. } => "FAILED",
            OpOutcome::Skipped => "planned",
            OpOutcome::Cancelled => "cancelled",
        };
        println!("  {status:<9} {}", record.op);
        if let OpOutcome::Failed { error } = &record.outcome {
            println!("            {error}");
        }
    }
    println!("{}", outcome.report);
}
