// Ledgerline CLI - config-driven ledger/statement reconciliation runs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ledgerline_cli::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_UNMATCHED, EXIT_USAGE};
use ledgerline_cli::{load_csv_rows, CliError, RunConfig, SourceConfig};
use ledgerline_recon::{ExportOrderer, RawRecord, ReconInput, ReconReport};

#[derive(Parser)]
#[command(name = "ledgerline")]
#[command(about = "Reconcile an internal ledger against a bank statement")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  ledgerline run recon.toml
  ledgerline run recon.toml --json
  ledgerline run recon.toml --output report.json
  ledgerline run recon.toml --csv results.csv --columns category,ledger_ids,statement_ids,confidence")]
    Run {
        /// Path to the run config file
        config: PathBuf,

        /// Print the JSON report to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write results as CSV to a file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Comma-separated column order for the CSV export
        #[arg(long, requires = "csv")]
        columns: Option<String>,
    },

    /// Validate a run config without running
    #[command(after_help = "\
Examples:
  ledgerline validate recon.toml")]
    Validate {
        /// Path to the run config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            csv,
            columns,
        } => cmd_run(config, json, output, csv, columns),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = &err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

fn load_config(config_path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(
            EXIT_RUNTIME,
            format!("cannot read {}: {e}", config_path.display()),
        )
    })?;
    RunConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e))
}

fn load_input(config_path: &Path, config: &RunConfig) -> Result<ReconInput, CliError> {
    // CSV paths resolve relative to the config file, not the cwd.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let load = |source: &SourceConfig| -> Result<Vec<RawRecord>, CliError> {
        let csv_path = base_dir.join(&source.file);
        let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
            CliError::new(
                EXIT_RUNTIME,
                format!("cannot read {}: {e}", csv_path.display()),
            )
        })?;
        let rows = load_csv_rows(&csv_data, &source.columns).map_err(|e| {
            CliError::new(EXIT_RUNTIME, format!("{}: {e}", csv_path.display()))
        })?;
        log::debug!("loaded {} rows from {}", rows.len(), csv_path.display());
        Ok(rows)
    };

    Ok(ReconInput {
        ledger: load(&config.ledger)?,
        statement: load(&config.statement)?,
    })
}

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
    columns: Option<String>,
) -> Result<(), CliError> {
    // Resolve the export order up front so a bad --columns fails
    // before any work.
    let orderer = match &columns {
        Some(spec) => ExportOrderer::from_spec(spec).map_err(|name| {
            CliError::new(EXIT_USAGE, format!("unknown export column: \"{name}\""))
                .with_hint("see `ledgerline run --help` for the column list")
        })?,
        None => ExportOrderer::default(),
    };

    let config = load_config(&config_path)?;
    let input = load_input(&config_path, &config)?;

    let report = ledgerline_recon::run(&config.engine, &input)
        .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(path) = &output_file {
        std::fs::write(path, &json_str).map_err(|e| {
            CliError::new(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display()))
        })?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(path) = &csv_file {
        write_csv(path, &orderer, &report)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    let s = &report.summary;
    eprintln!(
        "recon: {} ledger / {} statement records — {} exact, {} fuzzy, {} split, \
         {} unmatched, {} foreign credits, {} duplicates, {} skipped",
        s.ledger_records,
        s.statement_records,
        s.exact_matched,
        s.fuzzy_matched,
        s.split_matched,
        s.unmatched_ledger + s.unmatched_statement,
        s.foreign_credits,
        s.duplicates,
        s.skipped,
    );

    if !report.fully_reconciled() {
        return Err(CliError::new(EXIT_UNMATCHED, "unmatched records remain"));
    }
    Ok(())
}

fn write_csv(path: &Path, orderer: &ExportOrderer, report: &ReconReport) -> Result<(), CliError> {
    let runtime = |e: csv::Error| CliError::new(EXIT_RUNTIME, format!("CSV export: {e}"));
    let mut writer = csv::Writer::from_path(path).map_err(runtime)?;
    writer.write_record(orderer.header()).map_err(runtime)?;
    for result in &report.results {
        writer.write_record(orderer.row(result)).map_err(runtime)?;
    }
    writer
        .flush()
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("CSV export: {e}")))
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: ledger \"{}\" vs statement \"{}\" (threshold {}, date tolerance {}d, amount tolerance {})",
        config.ledger.file,
        config.statement.file,
        config.engine.score_threshold,
        config.engine.date_tolerance_days,
        config.engine.amount_tolerance_minor,
    );
    Ok(())
}
