//! Request records read from the data request mapping table
//!
//! A [`Record`] is built once from a [`RawRow`] and never changes afterwards.
//! All derived fields (identifier, effective mapping, STASH codes, priority,
//! applicability, inferred plan, groups) are computed at construction from the
//! raw cells and the active [`ModelProfile`].

use crate::config::ModelProfile;
use crate::error::{DreqError, Result};
use crate::stash;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// A single spreadsheet cell value. Empty cells are `None` at the use site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Text cell with surrounding whitespace removed
    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(value.as_ref().trim().to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the cell, parsing text if needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) => None,
        }
    }

    /// Empty text and zero are false, like a blank cell
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Bool(b) => *b,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
        }
    }
}

/// Helpers for optional cells
pub trait CellExt {
    fn text(&self) -> Option<&str>;
    fn is_truthy(&self) -> bool;
    /// Display form, empty for a blank cell
    fn display_or_empty(&self) -> String;
}

impl CellExt for Option<CellValue> {
    fn text(&self) -> Option<&str> {
        self.as_ref().and_then(CellValue::as_text)
    }

    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(CellValue::is_truthy)
    }

    fn display_or_empty(&self) -> String {
        self.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }
}

/// The recognised columns of the Diagnostics sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    CmorLabel,
    Miptable,
    CellMethods,
    Dimension,
    Units,
    Realm,
    Priority,
    Frequency,
    UkesmComponent,
    VariableMapping,
    Plan,
    Notes,
    ManualEdit,
    RequestGroupMembership,
    CfStdName,
    RequestingMips,
    Comment,
    Ticket,
    LastUpdate,
    Title,
    Positive,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::CmorLabel,
        Column::Miptable,
        Column::CellMethods,
        Column::Dimension,
        Column::Units,
        Column::Realm,
        Column::Priority,
        Column::Frequency,
        Column::UkesmComponent,
        Column::VariableMapping,
        Column::Plan,
        Column::Notes,
        Column::ManualEdit,
        Column::RequestGroupMembership,
        Column::CfStdName,
        Column::RequestingMips,
        Column::Comment,
        Column::Ticket,
        Column::LastUpdate,
        Column::Title,
        Column::Positive,
    ];

    /// Column heading as it appears in the sheet
    pub fn title(self) -> &'static str {
        match self {
            Column::CmorLabel => "cmor_label",
            Column::Miptable => "miptable",
            Column::CellMethods => "cell_methods",
            Column::Dimension => "dimension",
            Column::Units => "units",
            Column::Realm => "realm",
            Column::Priority => "priority",
            Column::Frequency => "frequency",
            Column::UkesmComponent => "UKESM_component",
            Column::VariableMapping => "Variable_mapping",
            Column::Plan => "Plan",
            Column::Notes => "Notes (this doesn't go in the metadata)",
            Column::ManualEdit => "Manual edit",
            Column::RequestGroupMembership => {
                "requestVarGroup membership (lists of mip:rvg label)"
            }
            Column::CfStdName => "cf_std_name",
            Column::RequestingMips => "requesting_mips",
            Column::Comment => "Comment (this goes into file metadata)",
            Column::Ticket => "Ticket",
            Column::LastUpdate => "last_update",
            Column::Title => "title",
            Column::Positive => "positive",
        }
    }

    /// Normalised key the heading is matched by
    pub fn key(self) -> String {
        normalize_title(self.title())
    }
}

/// Lower-case a heading, turn spaces and colons into underscores and drop
/// brackets and quotes.
///
/// `"Notes (this doesn't)"` becomes `"notes_this_doesnt"`.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '"' | '\''))
        .map(|c| if c == ' ' || c == ':' { '_' } else { c })
        .collect()
}

/// Title to position lookup, resolved once per sheet.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: IndexMap<Column, usize>,
    width: usize,
}

impl ColumnIndex {
    /// Resolve every recognised column in a header row.
    ///
    /// Fails with the full list of titles that could not be found.
    pub fn resolve(header: &[Option<String>]) -> Result<Self> {
        let keys: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell.as_deref().map(str::trim) {
                // Some exports lose the first heading
                None | Some("") if i == 0 => Column::CmorLabel.key(),
                Some(title) => normalize_title(title),
                None => String::new(),
            })
            .collect();

        let mut positions = IndexMap::new();
        let mut missing = Vec::new();
        for column in Column::ALL {
            let key = column.key();
            match keys.iter().position(|k| *k == key) {
                Some(pos) => {
                    positions.insert(column, pos);
                }
                None => missing.push(column.title().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(DreqError::missing_columns(missing));
        }

        Ok(Self {
            positions,
            width: header.len(),
        })
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    /// Number of header cells the index was resolved from
    pub fn width(&self) -> usize {
        self.width
    }

    /// Pick the recognised columns out of a data row; short rows give blanks
    pub fn raw_row(&self, row: &[Option<CellValue>]) -> RawRow {
        let mut raw = RawRow::new();
        for (&column, &pos) in &self.positions {
            raw.insert(column, row.get(pos).cloned().flatten());
        }
        raw
    }
}

/// Cell values of one data row, addressed by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: IndexMap<Column, Option<CellValue>>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text is trimmed; other values are kept as they are
    pub fn insert(&mut self, column: Column, value: Option<CellValue>) {
        let value = value.map(|v| match v {
            CellValue::Text(s) => CellValue::text(s),
            other => other,
        });
        self.cells.insert(column, value);
    }

    pub fn with(mut self, column: Column, value: Option<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Row with every column present and blank
    pub fn blank() -> Self {
        Column::ALL
            .into_iter()
            .fold(Self::new(), |row, column| row.with(column, None))
    }

    pub fn get(&self, column: Column) -> Option<&CellValue> {
        self.cells.get(&column).and_then(Option::as_ref)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.cells.contains_key(&column)
    }
}

/// The raw cells of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFields {
    pub cmor_label: Option<CellValue>,
    pub miptable: Option<CellValue>,
    pub cell_methods: Option<CellValue>,
    pub dimension: Option<CellValue>,
    pub units: Option<CellValue>,
    pub realm: Option<CellValue>,
    pub priority: Option<CellValue>,
    pub frequency: Option<CellValue>,
    pub ukesm_component: Option<CellValue>,
    pub variable_mapping: Option<CellValue>,
    pub plan: Option<CellValue>,
    pub notes: Option<CellValue>,
    pub manual_edit: Option<CellValue>,
    pub request_group_membership: Option<CellValue>,
    pub cf_std_name: Option<CellValue>,
    pub requesting_mips: Option<CellValue>,
    pub comment: Option<CellValue>,
    pub ticket: Option<CellValue>,
    pub last_update: Option<CellValue>,
    pub title: Option<CellValue>,
    pub positive: Option<CellValue>,
}

impl RawFields {
    fn from_raw(mut raw: RawRow) -> Result<Self> {
        let missing: Vec<String> = Column::ALL
            .iter()
            .filter(|c| !raw.contains(**c))
            .map(|c| c.title().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DreqError::missing_columns(missing));
        }

        let mut take = |column: Column| raw.cells.swap_remove(&column).flatten();
        Ok(Self {
            cmor_label: take(Column::CmorLabel),
            miptable: take(Column::Miptable),
            cell_methods: take(Column::CellMethods),
            dimension: take(Column::Dimension),
            units: take(Column::Units),
            realm: take(Column::Realm),
            priority: take(Column::Priority),
            frequency: take(Column::Frequency),
            ukesm_component: take(Column::UkesmComponent),
            variable_mapping: take(Column::VariableMapping),
            plan: take(Column::Plan),
            notes: take(Column::Notes),
            manual_edit: take(Column::ManualEdit),
            request_group_membership: take(Column::RequestGroupMembership),
            cf_std_name: take(Column::CfStdName),
            requesting_mips: take(Column::RequestingMips),
            comment: take(Column::Comment),
            ticket: take(Column::Ticket),
            last_update: take(Column::LastUpdate),
            title: take(Column::Title),
            positive: take(Column::Positive),
        })
    }
}

/// One requested variable with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    raw: RawFields,
    identifier: String,
    effective_mapping: Option<CellValue>,
    stash_codes: Vec<String>,
    mo_priority: Option<i64>,
    applicable: bool,
    inferred_plan: Option<CellValue>,
    groups: Vec<String>,
}

impl Record {
    /// Build a record from a row holding every recognised column
    pub fn from_raw(raw: RawRow, profile: &ModelProfile) -> Result<Self> {
        let raw = RawFields::from_raw(raw)?;

        let identifier = format!(
            "{}_{}",
            raw.miptable.display_or_empty(),
            raw.cmor_label.display_or_empty()
        );
        let effective_mapping = effective_mapping(&raw, profile);
        let stash_codes = derive_stash_codes(&raw, effective_mapping.as_ref(), profile);
        let mo_priority = derive_priority(&raw, profile, &identifier);
        let applicable = derive_applicable(&raw, &stash_codes, profile);
        let inferred_plan = if raw.manual_edit.is_truthy() {
            Some(CellValue::text("available"))
        } else {
            raw.plan.clone()
        };
        let groups = parse_groups(&raw.request_group_membership);

        Ok(Self {
            raw,
            identifier,
            effective_mapping,
            stash_codes,
            mo_priority,
            applicable,
            inferred_plan,
            groups,
        })
    }

    pub fn raw(&self) -> &RawFields {
        &self.raw
    }

    /// `<miptable>_<cmor_label>`
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn miptable(&self) -> Option<&str> {
        self.raw.miptable.text()
    }

    pub fn cmor_label(&self) -> Option<&str> {
        self.raw.cmor_label.text()
    }

    pub fn dimension(&self) -> Option<&str> {
        self.raw.dimension.text()
    }

    pub fn frequency(&self) -> Option<&str> {
        self.raw.frequency.text()
    }

    pub fn plan(&self) -> Option<&str> {
        self.raw.plan.text()
    }

    pub fn ukesm_component(&self) -> Option<&str> {
        self.raw.ukesm_component.text()
    }

    /// Mapping for the active model: the notes override if present, else the
    /// `Variable_mapping` cell
    pub fn effective_mapping(&self) -> Option<&CellValue> {
        self.effective_mapping.as_ref()
    }

    pub fn stash_codes(&self) -> &[String] {
        &self.stash_codes
    }

    /// Comma-joined codes, `None` when there are none
    pub fn stash_codes_needed(&self) -> Option<String> {
        if self.stash_codes.is_empty() {
            None
        } else {
            Some(self.stash_codes.join(","))
        }
    }

    /// Priority after any `MO_priority:` override
    pub fn priority(&self) -> Option<i64> {
        self.mo_priority
    }

    /// Whether the diagnostic applies to the active model
    pub fn is_applicable(&self) -> bool {
        self.applicable
    }

    pub fn inferred_plan(&self) -> Option<&CellValue> {
        self.inferred_plan.as_ref()
    }

    /// Request variable groups. A blank cell gives `[""]`.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

fn effective_mapping(raw: &RawFields, profile: &ModelProfile) -> Option<CellValue> {
    raw.notes
        .text()
        .and_then(|notes| profile.mapping_override(notes))
        .map(CellValue::text)
        .or_else(|| raw.variable_mapping.clone())
}

fn derive_stash_codes(
    raw: &RawFields,
    mapping: Option<&CellValue>,
    profile: &ModelProfile,
) -> Vec<String> {
    if !mapping.is_some_and(CellValue::is_truthy) {
        return Vec::new();
    }

    let mut codes = stash::stash_codes_from_cell(mapping).unwrap_or_default();
    let config = profile.config();
    if raw
        .dimension
        .text()
        .is_some_and(|d| d.contains(config.model_levels_marker.as_str()))
    {
        // Model level fields need the orography to be interpreted
        codes.push(config.orography_code.clone());
    }
    codes
}

fn derive_priority(raw: &RawFields, profile: &ModelProfile, identifier: &str) -> Option<i64> {
    let value = match raw.notes.text().and_then(|n| profile.priority_override(n)) {
        Some(over) => CellValue::text(over),
        None => raw.priority.clone()?,
    };

    let priority = match &value {
        CellValue::Text(s) => s.parse::<i64>().ok(),
        CellValue::Int(i) => Some(*i),
        CellValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        CellValue::Float(_) => None,
        CellValue::Bool(b) => Some(i64::from(*b)),
    };
    if priority.is_none() {
        log::warn!("{}: unreadable priority '{}'", identifier, value);
    }
    priority
}

fn derive_applicable(raw: &RawFields, codes: &[String], profile: &ModelProfile) -> bool {
    let excluded_component = raw
        .ukesm_component
        .text()
        .is_some_and(|c| profile.is_excluded_component(c));
    let excluded_section = codes.iter().any(|c| profile.is_excluded_section(c));
    let excluded_code = codes.iter().any(|c| profile.is_excluded_code(c));

    !(excluded_component || excluded_section || excluded_code)
}

fn parse_groups(value: &Option<CellValue>) -> Vec<String> {
    value
        .display_or_empty()
        .chars()
        .filter(|c| *c != '"' && *c != ' ')
        .collect::<String>()
        .split(',')
        .map(str::to_string)
        .collect()
}
