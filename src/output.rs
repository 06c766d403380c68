//! Output formatting utilities

use crate::change_detection::{DiffResult, MovedRecord, UpdatedRecord};
use crate::config::DreqConfig;
use crate::error::Result;
use crate::filter::{inferred_plan_is_produced, plan_is_produced};
use crate::record::{CellExt, Record};
use crate::snapshot::{RequestSnapshot, Table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fields listed for added and removed records, in order
pub const LISTED_FIELDS: [&str; 7] = [
    "cmor_label",
    "miptable",
    "cf_std_name",
    "title",
    "plan",
    "ukesm_component",
    "requesting_mips",
];

/// Default name of the removed-records file
pub const REMOVED_CSV_NAME: &str = "rm_at_17.csv";

fn listed_values(record: &Record) -> [String; 7] {
    let raw = record.raw();
    [
        raw.cmor_label.display_or_empty(),
        raw.miptable.display_or_empty(),
        raw.cf_std_name.display_or_empty(),
        raw.title.display_or_empty(),
        raw.plan.display_or_empty(),
        raw.ukesm_component.display_or_empty(),
        raw.requesting_mips.display_or_empty(),
    ]
}

/// Updated records sharing one component of the old record
#[derive(Debug, Serialize)]
pub struct ComponentUpdates<'a> {
    pub component: String,
    pub records: Vec<&'a UpdatedRecord<'a>>,
}

/// The diff arranged for reporting
#[derive(Debug, Serialize)]
pub struct DiffReport<'a> {
    pub old_source: &'a str,
    pub new_source: &'a str,
    pub generated_at: DateTime<Utc>,
    pub updated: Vec<ComponentUpdates<'a>>,
    pub moved: Vec<&'a MovedRecord<'a>>,
    pub added: Vec<&'a Record>,
    pub removed: Vec<&'a Record>,
}

impl<'a> DiffReport<'a> {
    /// Only records still produced (judged on the old version) are reported as
    /// updated or removed. Updates go by the inferred plan, removals by the
    /// plan cell.
    pub fn build(
        old: &'a RequestSnapshot,
        new: &'a RequestSnapshot,
        diff: &'a DiffResult<'a>,
        config: &DreqConfig,
    ) -> Self {
        let non_producing = &config.non_producing_plans;

        let mut updated: Vec<&UpdatedRecord> = diff
            .updated
            .iter()
            .filter(|u| inferred_plan_is_produced(u.old, non_producing))
            .collect();
        updated.sort_by_key(|u| u.old.raw().ukesm_component.display_or_empty());

        let mut groups: Vec<ComponentUpdates> = Vec::new();
        for update in updated {
            let component = update.old.raw().ukesm_component.display_or_empty();
            match groups.last_mut() {
                Some(group) if group.component == component => group.records.push(update),
                _ => groups.push(ComponentUpdates {
                    component,
                    records: vec![update],
                }),
            }
        }

        let mut moved: Vec<&MovedRecord> = diff.moved.iter().collect();
        moved.sort_by(|a, b| a.new.identifier().cmp(b.new.identifier()));

        let mut added = diff.added.clone();
        added.sort_by(|a, b| a.identifier().cmp(b.identifier()));

        let mut removed: Vec<&Record> = diff
            .removed
            .iter()
            .copied()
            .filter(|r| plan_is_produced(r, non_producing))
            .collect();
        removed.sort_by_key(|r| r.raw().cmor_label.display_or_empty());

        Self {
            old_source: old.source(),
            new_source: new.source(),
            generated_at: Utc::now(),
            updated: groups,
            moved,
            added,
            removed,
        }
    }

    pub fn updated_count(&self) -> usize {
        self.updated.iter().map(|g| g.records.len()).sum()
    }
}

/// `<new snapshot dir>/rm_at_17.csv` unless overridden
pub fn removed_csv_path(new_snapshot: &Path, custom: Option<&Path>) -> PathBuf {
    match custom {
        Some(path) => path.to_path_buf(),
        None => new_snapshot
            .parent()
            .map(|dir| dir.join(REMOVED_CSV_NAME))
            .unwrap_or_else(|| PathBuf::from(REMOVED_CSV_NAME)),
    }
}

/// Write removed records as `$`-separated rows under a header line
pub fn write_removed_csv<W: Write>(records: &[&Record], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'$').from_writer(out);
    writer.write_record(LISTED_FIELDS)?;
    for record in records {
        writer.write_record(listed_values(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty printer for dreqdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// `identifier, old title, old plan {field: (new, old), ...}`
    pub fn update_line(update: &UpdatedRecord) -> String {
        let delta = update
            .changes
            .iter()
            .map(|(field, change)| format!("'{}': ({}, {})", field, change.new, change.old))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}, {}, {} {{{}}}",
            update.new.identifier(),
            update.old.raw().title.display_or_empty(),
            update.old.raw().plan.display_or_empty(),
            delta
        )
    }

    /// `<new id> <old id>, <old plan>`
    pub fn move_line(moved: &MovedRecord) -> String {
        format!(
            "{} {}, {}",
            moved.new.identifier(),
            moved.old.identifier(),
            moved.old.raw().plan.display_or_empty()
        )
    }

    pub fn listed_line(record: &Record) -> String {
        listed_values(record).join("$")
    }

    /// Print the full diff report
    pub fn print_diff_report(report: &DiffReport, removed_csv: Option<&Path>) {
        println!("🔍 Request diff: {} → {}", report.old_source, report.new_source);

        println!();
        println!("UPDATED ({})", report.updated_count());
        for group in &report.updated {
            println!("--- {}", group.component);
            for update in &group.records {
                println!("{}", Self::update_line(update));
            }
        }

        println!();
        println!("MOVED ({})", report.moved.len());
        for moved in &report.moved {
            println!("{}", Self::move_line(moved));
        }

        println!();
        println!("ADDED ({})", report.added.len());
        println!("{}", LISTED_FIELDS.join("$"));
        for record in &report.added {
            println!("{}", Self::listed_line(record));
        }

        println!();
        println!("📊 Summary");
        println!("├─ Updated: {}", report.updated_count());
        println!("├─ Moved: {}", report.moved.len());
        println!("├─ Added: {}", report.added.len());
        match removed_csv {
            Some(path) => println!(
                "└─ Removed: {} (written to {})",
                report.removed.len(),
                path.display()
            ),
            None => println!("└─ Removed: {}", report.removed.len()),
        }
    }

    /// Print per-table record counts
    pub fn print_snapshot_summary(snapshot: &RequestSnapshot) {
        let (rows, columns) = snapshot.sheet_dimensions();
        println!("📋 Request: {}", snapshot.source());
        println!("├─ Sheet: {} rows x {} columns", rows, columns);
        println!("├─ Records: {}", snapshot.len());

        let tables = snapshot.tables();
        if tables.is_empty() {
            println!("└─ Tables: none");
            return;
        }
        println!("└─ Tables: {}", tables.len());
        for (i, table) in tables.iter().enumerate() {
            let prefix = if i == tables.len() - 1 { "   └─" } else { "   ├─" };
            println!("{} {}: {}", prefix, table.title, table.len());
        }
    }

    /// Print the records of one table
    pub fn print_table(table: &Table) {
        println!("📋 Table: {} ({} records)", table.title, table.len());
        for (i, record) in table.records.iter().enumerate() {
            let prefix = if i == table.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {} [{}] {}",
                prefix,
                record.identifier(),
                record.frequency().unwrap_or(""),
                record.stash_codes_needed().unwrap_or_default()
            );
        }
    }
}

/// Per-table counts of a snapshot
#[derive(Debug, Serialize)]
pub struct SnapshotSummary<'a> {
    pub source: &'a str,
    pub generated_at: DateTime<Utc>,
    pub sheet_dimensions: (usize, usize),
    pub records: usize,
    pub tables: Vec<TableCount<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TableCount<'a> {
    pub title: String,
    pub identifiers: Vec<&'a str>,
}

impl<'a> SnapshotSummary<'a> {
    pub fn build(snapshot: &'a RequestSnapshot) -> Self {
        Self {
            source: snapshot.source(),
            generated_at: Utc::now(),
            sheet_dimensions: snapshot.sheet_dimensions(),
            records: snapshot.len(),
            tables: snapshot
                .tables()
                .into_iter()
                .map(|t| TableCount {
                    identifiers: t.uniques(),
                    title: t.title,
                })
                .collect(),
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_table(table: &Table) -> Result<String> {
        let json = serde_json::json!({
            "title": table.title,
            "generated_at": Utc::now(),
            "records": table.records,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
