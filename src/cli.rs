//! Command-line interface for dreqdiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dreqdiff")]
#[command(about = "Compare versions of a climate data request spreadsheet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file (model name, plan lists, exclusions)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Debug with `--verbose`, Info otherwise
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    /// Logger at [`Cli::log_level`]; `RUST_LOG` directives are applied on top
    pub fn logger(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.log_level()).parse_default_env();
        builder
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the first sheet of a workbook to <PATH>.csv
    Export {
        /// Workbook to export
        path: PathBuf,

        /// Character set of the export: "ascii" or "utf8"
        #[arg(long, default_value = "ascii", value_parser = validate_encoding)]
        encoding: String,
    },

    /// Compare two versions of the request
    Diff {
        /// Earlier request workbook or CSV
        old: PathBuf,

        /// Later request workbook or CSV
        new: PathBuf,

        /// Apply the standard inclusion filters before comparing
        #[arg(long)]
        filter: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Where to write removed records (defaults next to the new request)
        #[arg(long)]
        removed_csv: Option<PathBuf>,

        /// Hide progress spinners
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the tables of one request
    Show {
        /// Request workbook or CSV
        path: PathBuf,

        /// Apply the standard inclusion filters
        #[arg(long)]
        filter: bool,

        /// Only list the records of this MIP table
        #[arg(long)]
        table: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Hide progress spinners
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration or write it to a file
    Config {
        /// File to write the configuration to
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

fn validate_encoding(s: &str) -> Result<String, String> {
    crate::data::ExportEncoding::parse(s).map(|_| s.to_string())
}
