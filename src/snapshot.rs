//! Request snapshots: every record read from one version of the request table

use crate::config::{ModelProfile, RowValidation};
use crate::data::{Sheet, SheetReader};
use crate::error::{DreqError, Result};
use crate::filter::{FilterPipeline, RecordFilter};
use crate::progress::ProgressReporter;
use crate::record::{CellExt, CellValue, ColumnIndex, Record};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// The ordered records of one request table
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestSnapshot {
    source: String,
    sheet_dimensions: (usize, usize),
    records: Vec<Record>,
}

impl RequestSnapshot {
    pub fn new(source: impl Into<String>, sheet_dimensions: (usize, usize), records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            sheet_dimensions,
            records,
        }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self::new("", (0, 0), records)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `(rows, columns)` of the sheet the snapshot was read from
    pub fn sheet_dimensions(&self) -> (usize, usize) {
        self.sheet_dimensions
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New snapshot holding only the records `filter` accepts
    pub fn retain(&self, filter: &RecordFilter) -> Self {
        Self {
            source: self.source.clone(),
            sheet_dimensions: self.sheet_dimensions,
            records: self.records.iter().filter(|r| filter.test(r)).cloned().collect(),
        }
    }

    /// Sorted, distinct MIP table names
    pub fn table_names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.raw().miptable.display_or_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn records_for_table(&self, table: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.raw().miptable.display_or_empty() == table)
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<Table<'_>> {
        let records = self.records_for_table(name);
        if records.is_empty() {
            None
        } else {
            Some(Table::new(name, records))
        }
    }

    /// One table per MIP table name, in name order
    pub fn tables(&self) -> Vec<Table<'_>> {
        self.table_names()
            .into_iter()
            .map(|name| {
                let records = self.records_for_table(&name);
                Table::new(name, records)
            })
            .collect()
    }

    /// Identifiers that occur more than once, in first-seen order
    pub fn duplicate_identifiers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for record in &self.records {
            let id = record.identifier();
            if !seen.insert(id) && reported.insert(id) {
                duplicates.push(id);
            }
        }
        duplicates
    }
}

impl<'a> IntoIterator for &'a RequestSnapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The records of one MIP table, with per-column projections
#[derive(Debug, Clone)]
pub struct Table<'a> {
    pub title: String,
    pub records: Vec<&'a Record>,
}

impl<'a> Table<'a> {
    pub fn new(title: impl Into<String>, records: Vec<&'a Record>) -> Self {
        Self {
            title: title.into(),
            records,
        }
    }

    fn column(&self, pick: impl Fn(&Record) -> &Option<CellValue>) -> Vec<Option<&'a CellValue>> {
        self.records.iter().map(|r| pick(*r).as_ref()).collect()
    }

    pub fn cell_methods(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().cell_methods)
    }

    pub fn dimensions(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().dimension)
    }

    /// Record identifiers
    pub fn uniques(&self) -> Vec<&'a str> {
        self.records.iter().map(|r| r.identifier()).collect()
    }

    pub fn realms(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().realm)
    }

    /// Frequencies
    pub fn times(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().frequency)
    }

    pub fn stashs(&self) -> Vec<Option<String>> {
        self.records.iter().map(|r| r.stash_codes_needed()).collect()
    }

    pub fn cmors(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().cmor_label)
    }

    pub fn varnames(&self) -> Vec<Option<&'a CellValue>> {
        self.cmors()
    }

    pub fn units(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().units)
    }

    pub fn cmip6_priorities(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().priority)
    }

    pub fn ukesm_components(&self) -> Vec<Option<&'a CellValue>> {
        self.column(|r| &r.raw().ukesm_component)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds snapshots from sheets, applying an optional inclusion pipeline
pub struct SnapshotLoader<'p> {
    profile: &'p ModelProfile,
    pipeline: Option<FilterPipeline>,
    progress: ProgressReporter,
}

impl<'p> SnapshotLoader<'p> {
    pub fn new(profile: &'p ModelProfile) -> Self {
        Self {
            profile,
            pipeline: None,
            progress: ProgressReporter::new_minimal(),
        }
    }

    pub fn with_filter(mut self, pipeline: FilterPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.progress = ProgressReporter::from_flag(show_progress);
        self
    }

    /// Read the configured sheet of `path` into a snapshot
    pub fn load(&mut self, path: &Path) -> Result<RequestSnapshot> {
        self.progress.start(&format!("Reading {}...", path.display()));
        let sheet = SheetReader::read_sheet(path, &self.profile.config().sheet_name)?;
        let snapshot = self.build_snapshot(&sheet, path.display().to_string())?;
        self.progress
            .finish(&format!("Loaded {} records from {}", snapshot.len(), path.display()));
        Ok(snapshot)
    }

    /// Build a snapshot from an in-memory sheet whose first row holds the titles
    pub fn build_snapshot(&self, sheet: &Sheet, source: impl Into<String>) -> Result<RequestSnapshot> {
        let source = source.into();
        let header = sheet.header().ok_or_else(|| DreqError::EmptySheet {
            name: sheet.name.clone(),
        })?;
        let index = ColumnIndex::resolve(&header)?;

        let config = self.profile.config();
        let mut records = Vec::new();
        let mut skipped = 0;
        for row in sheet.data_rows() {
            if !still_valid(row, &config.row_validation, &config.deletion_marker) {
                skipped += 1;
                continue;
            }
            let record = Record::from_raw(index.raw_row(row), self.profile)?;
            match &self.pipeline {
                Some(pipeline) if !pipeline.accepts(&record) => skipped += 1,
                _ => records.push(record),
            }
        }

        let snapshot = RequestSnapshot::new(source, sheet.dimensions(), records);
        log::info!(
            "{}: {} records kept, {} skipped",
            snapshot.source(),
            snapshot.len(),
            skipped
        );
        let duplicates = snapshot.duplicate_identifiers();
        if !duplicates.is_empty() {
            log::warn!(
                "{}: {} identifiers occur more than once (later rows win when diffing): {}",
                snapshot.source(),
                duplicates.len(),
                duplicates.join(", ")
            );
        }
        Ok(snapshot)
    }
}

/// Structural row check. Always true unless validation is enabled, in which
/// case the first cell must be filled and the marker column must not hold the
/// deletion marker.
pub fn still_valid(row: &[Option<CellValue>], validation: &RowValidation, marker: &str) -> bool {
    if !validation.enabled {
        return true;
    }
    if !row.first().cloned().flatten().is_truthy() {
        return false;
    }
    match row.get(validation.marker_column).and_then(Option::as_ref) {
        None => true,
        Some(value) => !value.to_string().contains(marker),
    }
}
