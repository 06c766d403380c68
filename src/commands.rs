//! Command implementations for dreqdiff CLI

use crate::change_detection::SnapshotDiffer;
use crate::cli::{Commands, OutputFormat};
use crate::config::{DreqConfig, ModelProfile};
use crate::data::{export_path, export_sheet, ExportEncoding, SheetReader};
use crate::error::{DreqError, Result};
use crate::filter::{not_deleted, FilterPipeline};
use crate::output::{
    removed_csv_path, write_removed_csv, DiffReport, JsonFormatter, PrettyPrinter, SnapshotSummary,
};
use crate::progress::ProgressReporter;
use crate::snapshot::{RequestSnapshot, SnapshotLoader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = DreqConfig::load_or_default(config_path)?;
    match command {
        Commands::Export { path, encoding } => export_command(&path, &encoding),
        Commands::Diff {
            old,
            new,
            filter,
            format,
            removed_csv,
            quiet,
        } => diff_command(&config, &old, &new, filter, &format, removed_csv.as_deref(), quiet),
        Commands::Show {
            path,
            filter,
            table,
            format,
            quiet,
        } => show_command(&config, &path, filter, table.as_deref(), &format, quiet),
        Commands::Config { output, force } => config_command(&config, output.as_deref(), force),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(DreqError::invalid_input)
}

fn load_snapshot(
    profile: &ModelProfile,
    path: &Path,
    filter: bool,
    show_progress: bool,
) -> Result<RequestSnapshot> {
    let mut loader = SnapshotLoader::new(profile).with_progress(show_progress);
    if filter {
        loader = loader.with_filter(FilterPipeline::standard(profile.config()));
    }
    loader.load(path)
}

/// Dump the first sheet of a workbook as text
fn export_command(path: &Path, encoding: &str) -> Result<()> {
    let encoding = ExportEncoding::parse(encoding).map_err(DreqError::invalid_input)?;
    let sheet = SheetReader::read_first_sheet(path)?;
    let target = export_path(path);

    let mut out = BufWriter::new(File::create(&target)?);
    let summary = export_sheet(&sheet, &mut out, encoding)?;

    match summary.stopped_at {
        Some(row) => println!(
            "⚠️  Export of '{}' stopped at row {} ({} rows written to {})",
            sheet.name,
            row + 1,
            summary.rows_written,
            target.display()
        ),
        None => println!(
            "✅ Exported {} rows of '{}' to {}",
            summary.rows_written,
            sheet.name,
            target.display()
        ),
    }
    Ok(())
}

/// Compare two versions of the request
fn diff_command(
    config: &DreqConfig,
    old_path: &Path,
    new_path: &Path,
    filter: bool,
    format: &str,
    removed_csv: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let profile = config.profile()?;

    let keep = not_deleted(config);
    let old = load_snapshot(&profile, old_path, filter, !quiet)?.retain(&keep);
    let new = load_snapshot(&profile, new_path, filter, !quiet)?.retain(&keep);
    log::debug!(
        "Comparing {} old against {} new records",
        old.len(),
        new.len()
    );

    let mut progress = ProgressReporter::from_flag(!quiet);
    progress.start("Comparing requests...");
    let diff = SnapshotDiffer::diff(&old, &new);
    progress.finish(&format!("Found {} changes", diff.total_changes()));

    let report = DiffReport::build(&old, &new, &diff, config);

    let csv_path = removed_csv_path(new_path, removed_csv);
    write_removed_csv(&report.removed, BufWriter::new(File::create(&csv_path)?))?;
    log::info!(
        "Wrote {} removed records to {}",
        report.removed.len(),
        csv_path.display()
    );

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_diff_report(&report, Some(csv_path.as_path())),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }
    Ok(())
}

/// Show the tables of one request
fn show_command(
    config: &DreqConfig,
    path: &Path,
    filter: bool,
    table: Option<&str>,
    format: &str,
    quiet: bool,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let profile = config.profile()?;
    let snapshot = load_snapshot(&profile, path, filter, !quiet)?;

    match table {
        Some(name) => {
            let table = snapshot
                .table(name)
                .ok_or_else(|| DreqError::invalid_input(format!("No records for table '{}'", name)))?;
            match output_format {
                OutputFormat::Pretty => PrettyPrinter::print_table(&table),
                OutputFormat::Json => println!("{}", JsonFormatter::format_table(&table)?),
            }
        }
        None => match output_format {
            OutputFormat::Pretty => PrettyPrinter::print_snapshot_summary(&snapshot),
            OutputFormat::Json => {
                println!("{}", JsonFormatter::format(&SnapshotSummary::build(&snapshot))?)
            }
        },
    }
    Ok(())
}

/// Print or save the effective configuration
fn config_command(config: &DreqConfig, output: Option<&Path>, force: bool) -> Result<()> {
    match output {
        Some(path) => {
            config.save(path, force)?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}
