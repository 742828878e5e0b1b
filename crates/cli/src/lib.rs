//! `ledgerline-cli` — run-config loading and CSV ingestion for the
//! `ledgerline` binary. The engine itself lives in `ledgerline-recon`.

pub mod exit_codes;

use ledgerline_recon::{EngineConfig, RawRecord};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A CLI failure carrying its exit code. The hint, when present, is a
/// one-line suggestion printed under the error.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Run config
// ---------------------------------------------------------------------------

/// Maps the caller's CSV headers onto the four fields the engine
/// consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMap {
    pub id: String,
    pub date: String,
    pub amount: String,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// CSV path, resolved relative to the config file's directory.
    pub file: String,
    pub columns: ColumnMap,
}

/// One run: two CSV sources plus engine settings. Everything under
/// `[engine]` is optional and falls back to the engine defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub ledger: SourceConfig,
    pub statement: SourceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, String> {
        let config: RunConfig = toml::from_str(input).map_err(|e| e.to_string())?;
        config.engine.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// CSV ingestion
// ---------------------------------------------------------------------------

/// Read one source's rows. Header lookup is strict (a missing mapped
/// column is an error); cell values are passed through untouched, and
/// the engine's normalizer triages anything malformed.
pub fn load_csv_rows(csv_data: &str, columns: &ColumnMap) -> Result<Vec<RawRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let position = |name: &str| -> Result<usize, String> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| format!("column \"{name}\" not found in CSV header"))
    };
    let id_at = position(&columns.id)?;
    let date_at = position(&columns.date)?;
    let amount_at = position(&columns.amount)?;
    let reference_at = position(&columns.reference)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {}: {e}", line + 2))?;
        let field = |at: usize| record.get(at).unwrap_or("").to_string();
        rows.push(RawRecord {
            id: field(id_at),
            date: field(date_at),
            amount: field(amount_at),
            reference: field(reference_at),
        });
    }
    Ok(rows)
}
