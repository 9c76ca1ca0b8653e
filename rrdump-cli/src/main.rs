//! CLI for the rrdump archive dumper.
//!
//! Provides commands for inspecting round-robin database headers and dumping
//! archive rows as CSV or JSON.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use rrdump::value::format_value;
use rrdump::{Dumper, RowDump};
use tracing_subscriber::EnvFilter;

/// rrdump — Read-only archive dumper for round-robin database files.
#[derive(Parser)]
#[command(name = "rrdump", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Display header metadata as `rrdtool info` style key/value pairs.
    Info {
        /// Path to the round-robin file.
        file: PathBuf,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: InfoFormat,
    },

    /// Dump every row of one archive, oldest first.
    Dump {
        /// Path to the round-robin file.
        file: PathBuf,

        /// Consolidation function of the archive to dump (first match wins).
        #[arg(long, default_value = "AVERAGE")]
        cf: String,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: DumpFormat,
    },
}

/// Output format for header reports.
#[derive(Clone, ValueEnum)]
enum InfoFormat {
    /// One `key = value` line per entry.
    Text,
    /// JSON object keyed by entry name.
    Json,
}

/// Output format for archive dumps.
#[derive(Clone, ValueEnum)]
enum DumpFormat {
    /// Comma-separated values.
    Csv,
    /// JSON object with a `data` array of rows.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { file, format } => cmd_info(&file, &format),
        Commands::Dump { file, cf, format } => cmd_dump(&file, &cf, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `rrdump info <file>`.
fn cmd_info(file: &Path, format: &InfoFormat) -> Result<(), Box<dyn std::error::Error>> {
    let report = rrdump::info(file)?;

    match format {
        InfoFormat::Text => print!("{report}"),
        InfoFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Implements `rrdump dump <file>`.
fn cmd_dump(file: &Path, cf: &str, format: &DumpFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut dumper = Dumper::open(file)?;
    dumper.select_archive(cf)?;

    let names: Vec<String> = dumper
        .header()
        .data_sources()
        .iter()
        .map(|ds| ds.name.clone())
        .collect();
    let data = dumper.rows().collect::<rrdump::Result<Vec<_>>>()?;
    let path = dumper.path().to_string();
    dumper.close();

    tracing::debug!(file = %path, cf, rows = data.len(), "dumped archive");

    match format {
        DumpFormat::Csv => {
            println!("{}", csv_header(&names));
            for row in &data {
                println!("{}", csv_row(row));
            }
        }
        DumpFormat::Json => {
            let output = serde_json::json!({
                "file": path,
                "cf": cf,
                "rows": data.len(),
                "data_sources": names,
                "data": data,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Formats the CSV header line: `timestamp` followed by the source names.
fn csv_header(names: &[String]) -> String {
    std::iter::once("timestamp")
        .chain(names.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

/// Formats one CSV data line; unknown values print as `NaN`.
fn csv_row(row: &RowDump) -> String {
    let mut line = row.timestamp.to_string();
    for value in &row.values {
        line.push(',');
        line.push_str(&format_value(*value));
    }
    line
}
