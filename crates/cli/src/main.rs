// skumatch CLI - match incoming/outgoing goods records against a product catalog

mod exit_codes;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use skumatch_recon::model::{OperationKind, RecordBatch};
use skumatch_recon::MatchError;

use exit_codes::{match_exit_code, EXIT_ERROR, EXIT_SUCCESS};
use pipeline::Workspace;

#[derive(Parser)]
#[command(name = "skumatch")]
#[command(about = "Match goods records against a product catalog and page the rest for review")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Hide the progress bar
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  skumatch validate skumatch.toml")]
    Validate {
        /// Path to the skumatch.toml config file
        config: PathBuf,
    },

    /// Normalize sources and match them against the catalog
    #[command(after_help = "\
Examples:
  skumatch match skumatch.toml
  skumatch match skumatch.toml --kind incoming
  skumatch match skumatch.toml --reload")]
    Match {
        config: PathBuf,

        /// Which stream to match
        #[arg(long, value_enum, default_value = "both")]
        kind: KindArg,

        /// Discard checkpoints and rebuild batches from the source files
        #[arg(long)]
        reload: bool,
    },

    /// Write review workbooks for records without a catalog id
    Report {
        config: PathBuf,

        #[arg(long, value_enum, default_value = "both")]
        kind: KindArg,
    },

    /// Write matched records grouped by counterpart and year
    Export {
        config: PathBuf,

        #[arg(long, value_enum, default_value = "both")]
        kind: KindArg,
    },

    /// Print match statistics of checkpointed batches
    Stats {
        config: PathBuf,

        #[arg(long, value_enum, default_value = "both")]
        kind: KindArg,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// match + report + export + stats in one go
    #[command(after_help = "\
Examples:
  skumatch run skumatch.toml
  RUST_LOG=debug skumatch run skumatch.toml --reload")]
    Run {
        config: PathBuf,

        #[arg(long, value_enum, default_value = "both")]
        kind: KindArg,

        #[arg(long)]
        reload: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Incoming,
    Outgoing,
    Both,
}

impl KindArg {
    fn kinds(self) -> Vec<OperationKind> {
        match self {
            Self::Incoming => vec![OperationKind::Incoming],
            Self::Outgoing => vec![OperationKind::Outgoing],
            Self::Both => vec![OperationKind::Incoming, OperationKind::Outgoing],
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();
    let progress = !cli.quiet;

    let result = match cli.command {
        Commands::Validate { config } => cmd_validate(config),
        Commands::Match { config, kind, reload } => cmd_match(config, kind, reload, progress).map(|_| ()),
        Commands::Report { config, kind } => cmd_report(config, kind),
        Commands::Export { config, kind } => cmd_export(config, kind),
        Commands::Stats { config, kind, json } => cmd_stats(config, kind, json),
        Commands::Run { config, kind, reload } => cmd_run(config, kind, reload, progress),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }
}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        let hint = match &err {
            MatchError::Checkpoint { message, .. } if message == pipeline::NO_CHECKPOINT => {
                Some("run `skumatch match <config>` first".to_string())
            }
            MatchError::ConfigParse(_) => Some("see `skumatch validate --help`".to_string()),
            MatchError::CatalogLoad(_) => Some("check [catalog] file, header_row and columns".to_string()),
            _ => None,
        };
        Self { code: match_exit_code(&err), message: err.to_string(), hint }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_validate(config: PathBuf) -> Result<(), CliError> {
    let ws = Workspace::load(&config)?;
    eprintln!(
        "config ok: {} (catalog {}, sources {})",
        ws.config.name,
        ws.path(&ws.config.catalog.file).display(),
        ws.path(&ws.config.sources.root).display()
    );
    Ok(())
}

fn cmd_match(config: PathBuf, kind: KindArg, reload: bool, progress: bool) -> Result<Vec<RecordBatch>, CliError> {
    let ws = Workspace::load(&config)?;
    let catalog = ws.load_catalog()?;
    let mut batches = Vec::new();
    for kind in kind.kinds() {
        batches.push(pipeline::match_kind(&ws, &catalog, kind, reload, progress)?);
    }
    Ok(batches)
}

fn load_batches(ws: &Workspace, kind: KindArg) -> Result<Vec<RecordBatch>, CliError> {
    kind.kinds()
        .into_iter()
        .map(|k| ws.checkpointed_batch(k).map_err(CliError::from))
        .collect()
}

fn cmd_report(config: PathBuf, kind: KindArg) -> Result<(), CliError> {
    let ws = Workspace::load(&config)?;
    for batch in load_batches(&ws, kind)? {
        write_reports(&ws, &batch)?;
    }
    Ok(())
}

fn write_reports(ws: &Workspace, batch: &RecordBatch) -> Result<(), CliError> {
    let written = pipeline::report_kind(ws, batch)?;
    if written.is_empty() {
        eprintln!("{}: nothing to review", batch.kind);
    }
    for path in written {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_export(config: PathBuf, kind: KindArg) -> Result<(), CliError> {
    let ws = Workspace::load(&config)?;
    for batch in load_batches(&ws, kind)? {
        write_exports(&ws, &batch)?;
    }
    Ok(())
}

fn write_exports(ws: &Workspace, batch: &RecordBatch) -> Result<(), CliError> {
    let written = pipeline::export_kind(ws, batch)?;
    eprintln!("{}: exported {} workbook(s)", batch.kind, written.len());
    Ok(())
}

fn cmd_stats(config: PathBuf, kind: KindArg, json: bool) -> Result<(), CliError> {
    let ws = Workspace::load(&config)?;
    let batches = load_batches(&ws, kind)?;
    print_stats(&batches, json)
}

fn print_stats(batches: &[RecordBatch], json: bool) -> Result<(), CliError> {
    let stats = pipeline::stats_of(batches);
    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        for s in &stats {
            println!("{s}");
        }
    }
    Ok(())
}

fn cmd_run(config: PathBuf, kind: KindArg, reload: bool, progress: bool) -> Result<(), CliError> {
    let batches = cmd_match(config.clone(), kind, reload, progress)?;
    let ws = Workspace::load(&config)?;
    for batch in &batches {
        write_reports(&ws, batch)?;
        write_exports(&ws, batch)?;
    }
    print_stats(&batches, false)
}
