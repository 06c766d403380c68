//! Change detection between two versions of the request table
//!
//! Records are matched by identifier. Matched records are compared on a small
//! set of metadata fields, each through its own normaliser so cosmetic edits
//! are not reported. Unmatched records are then paired up as moves when an
//! added and a removed record describe the same physical quantity.

use crate::record::{CellExt, CellValue, Record};
use crate::snapshot::RequestSnapshot;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static CELL_METHODS_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(comment:.*\)").expect("invalid comment pattern"));

static NUMBERED_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time\d+").expect("invalid time dimension pattern"));

const COMMENT_PLACEHOLDER: &str = "(comment:..)";

/// Fields compared between two versions of the same record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparedField {
    CellMethods,
    Dimension,
    Units,
    Positive,
}

impl ComparedField {
    pub const ALL: [ComparedField; 4] = [
        ComparedField::CellMethods,
        ComparedField::Dimension,
        ComparedField::Units,
        ComparedField::Positive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComparedField::CellMethods => "cell_methods",
            ComparedField::Dimension => "dimension",
            ComparedField::Units => "units",
            ComparedField::Positive => "positive",
        }
    }

    fn value(self, record: &Record) -> Option<&CellValue> {
        let raw = record.raw();
        match self {
            ComparedField::CellMethods => raw.cell_methods.as_ref(),
            ComparedField::Dimension => raw.dimension.as_ref(),
            ComparedField::Units => raw.units.as_ref(),
            ComparedField::Positive => raw.positive.as_ref(),
        }
    }

    /// Apply this field's normaliser
    pub fn normalize(self, value: Option<&CellValue>) -> NormalizedValue {
        match self {
            ComparedField::CellMethods => clean_cell_methods(value),
            ComparedField::Dimension => NormalizedValue::from_cell(value),
            ComparedField::Units => clean_units(value),
            ComparedField::Positive => clean_positive(value),
        }
    }
}

impl fmt::Display for ComparedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field value after normalisation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Missing,
    Text(String),
    Number(f64),
}

impl NormalizedValue {
    fn from_cell(value: Option<&CellValue>) -> Self {
        match value {
            Some(v) => Self::Text(v.to_string()),
            None => Self::Missing,
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "None"),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Number(n) => write!(f, "{:?}", n),
        }
    }
}

/// Collapse any `(comment:...)` text so only the methods themselves count
pub fn clean_cell_methods(value: Option<&CellValue>) -> NormalizedValue {
    match value {
        Some(v) => NormalizedValue::Text(
            CELL_METHODS_COMMENT
                .replace_all(&v.to_string(), COMMENT_PLACEHOLDER)
                .into_owned(),
        ),
        None => NormalizedValue::Missing,
    }
}

/// Numeric units compare as numbers, so `1` equals `1.0`
pub fn clean_units(value: Option<&CellValue>) -> NormalizedValue {
    match value {
        Some(v) => match v.as_f64() {
            Some(n) => NormalizedValue::Number(n),
            None => NormalizedValue::Text(v.to_string()),
        },
        None => NormalizedValue::Missing,
    }
}

/// The literal strings `none`/`None` mean no value
pub fn clean_positive(value: Option<&CellValue>) -> NormalizedValue {
    match value {
        Some(v) => {
            let text = v.to_string();
            if text == "none" || text == "None" {
                NormalizedValue::Missing
            } else {
                NormalizedValue::Text(text)
            }
        }
        None => NormalizedValue::Missing,
    }
}

/// Dimension tokens with `time1`, `time2`... folded to `time`, sorted
pub fn clean_dimension_tokens(dimension: &str) -> Vec<String> {
    let folded = NUMBERED_TIME.replace_all(dimension, "time");
    let mut tokens: Vec<String> = folded.split_whitespace().map(str::to_string).collect();
    tokens.sort();
    tokens
}

/// Frequency without a trailing point-in-time `Pt` marker
pub fn clean_frequency(frequency: &str) -> &str {
    frequency.strip_suffix("Pt").unwrap_or(frequency)
}

/// New and old value of one changed field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub new: NormalizedValue,
    pub old: NormalizedValue,
}

/// A record present in both versions whose compared fields differ
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedRecord<'a> {
    pub new: &'a Record,
    pub old: &'a Record,
    pub changes: IndexMap<ComparedField, FieldChange>,
}

/// An added record paired with the removed record it replaces
#[derive(Debug, Clone, Serialize)]
pub struct MovedRecord<'a> {
    pub new: &'a Record,
    pub old: &'a Record,
}

/// Categorised differences between two snapshots, in snapshot order
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult<'a> {
    pub added: Vec<&'a Record>,
    pub removed: Vec<&'a Record>,
    pub moved: Vec<MovedRecord<'a>>,
    pub updated: Vec<UpdatedRecord<'a>>,
}

impl DiffResult<'_> {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.moved.is_empty()
            || !self.updated.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.moved.len() + self.updated.len()
    }
}

/// Compares two request snapshots
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    /// Classify every record of `old` and `new` as added, removed, moved or updated.
    ///
    /// Identifiers repeated within one snapshot collide and the later record wins.
    pub fn diff<'a>(old: &'a RequestSnapshot, new: &'a RequestSnapshot) -> DiffResult<'a> {
        let old_by_id = index_by_identifier(old);
        let new_by_id = index_by_identifier(new);

        let mut updated = Vec::new();
        let mut added = Vec::new();
        for (id, &new_record) in &new_by_id {
            match old_by_id.get(id) {
                Some(&old_record) => {
                    let changes = Self::compare_records(new_record, old_record);
                    if !changes.is_empty() {
                        updated.push(UpdatedRecord {
                            new: new_record,
                            old: old_record,
                            changes,
                        });
                    }
                }
                None => added.push(new_record),
            }
        }

        let removed: Vec<&Record> = old_by_id
            .iter()
            .filter(|(id, _)| !new_by_id.contains_key(*id))
            .map(|(_, &record)| record)
            .collect();

        let pairs = Self::find_moves(&added, &removed);
        log::debug!(
            "{} updated, {} added, {} removed before move detection, {} moves",
            updated.len(),
            added.len(),
            removed.len(),
            pairs.len()
        );

        let mut moved_adds = vec![false; added.len()];
        let mut moved_removes = vec![false; removed.len()];
        let moved = pairs
            .iter()
            .map(|&(a, r)| {
                moved_adds[a] = true;
                moved_removes[r] = true;
                MovedRecord {
                    new: added[a],
                    old: removed[r],
                }
            })
            .collect();

        DiffResult {
            added: keep_unmarked(added, &moved_adds),
            removed: keep_unmarked(removed, &moved_removes),
            moved,
            updated,
        }
    }

    /// Normalised values of each compared field that differs, as `(new, old)`
    pub fn compare_records(new: &Record, old: &Record) -> IndexMap<ComparedField, FieldChange> {
        let mut changes = IndexMap::new();
        for field in ComparedField::ALL {
            let new_value = field.normalize(field.value(new));
            let old_value = field.normalize(field.value(old));
            if new_value != old_value {
                changes.insert(
                    field,
                    FieldChange {
                        new: new_value,
                        old: old_value,
                    },
                );
            }
        }
        changes
    }

    /// Whether `added` is the same quantity as `removed` under another identifier
    pub fn is_move(added: &Record, removed: &Record) -> bool {
        let a = added.raw();
        let r = removed.raw();

        let same_cell_methods = clean_cell_methods(a.cell_methods.as_ref())
            == clean_cell_methods(r.cell_methods.as_ref());
        let same_dimensions = clean_dimension_tokens(&a.dimension.display_or_empty())
            == clean_dimension_tokens(&r.dimension.display_or_empty());
        let same_name = a.cf_std_name == r.cf_std_name || a.title == r.title;
        let same_frequency = clean_frequency(&a.frequency.display_or_empty())
            == clean_frequency(&r.frequency.display_or_empty());

        same_cell_methods && same_dimensions && same_name && same_frequency
    }

    /// Pair added with removed records, as `(added index, removed index)`.
    ///
    /// Each added record takes the first still-unpaired removed record that
    /// matches, so a record is part of at most one move. Several candidates are
    /// resolved by snapshot order, not by closeness.
    pub fn find_moves(added: &[&Record], removed: &[&Record]) -> Vec<(usize, usize)> {
        let mut taken = vec![false; removed.len()];
        let mut pairs = Vec::new();
        for (a, add) in added.iter().enumerate() {
            let candidate = removed
                .iter()
                .enumerate()
                .find(|(r, rem)| !taken[*r] && Self::is_move(add, rem));
            if let Some((r, _)) = candidate {
                taken[r] = true;
                pairs.push((a, r));
            }
        }
        pairs
    }
}

fn index_by_identifier(snapshot: &RequestSnapshot) -> IndexMap<&str, &Record> {
    let mut by_id = IndexMap::with_capacity(snapshot.len());
    for record in snapshot {
        by_id.insert(record.identifier(), record);
    }
    by_id
}

fn keep_unmarked<'a>(records: Vec<&'a Record>, marked: &[bool]) -> Vec<&'a Record> {
    records
        .into_iter()
        .zip(marked)
        .filter(|(_, m)| !**m)
        .map(|(record, _)| record)
        .collect()
}
