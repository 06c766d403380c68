//! Spreadsheet and CSV reading, and sheet-to-text export

use crate::error::{DreqError, Result};
use crate::record::CellValue;
use calamine::{open_workbook_auto, Data, Reader};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One sheet held in memory as rows of optional cells
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Option<CellValue>>>,
}

impl Sheet {
    /// `(rows, columns)` extent of the sheet
    pub fn dimensions(&self) -> (usize, usize) {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), columns)
    }

    /// Header cells rendered as text
    pub fn header(&self) -> Option<Vec<Option<String>>> {
        self.rows
            .first()
            .map(|row| row.iter().map(|c| c.as_ref().map(|v| v.to_string())).collect())
    }

    pub fn data_rows(&self) -> &[Vec<Option<CellValue>>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Reads request tables from workbooks (via calamine) or CSV exports
pub struct SheetReader;

impl SheetReader {
    pub fn is_supported_format(path: &Path) -> bool {
        Self::is_csv(path) || Self::is_workbook(path)
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    fn is_csv(path: &Path) -> bool {
        Self::extension(path).as_deref() == Some("csv")
    }

    fn is_workbook(path: &Path) -> bool {
        Self::extension(path).is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.as_str()))
    }

    fn check_input(path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(DreqError::invalid_input(format!(
                "File not found: {}",
                path.display()
            )));
        }
        if !Self::is_supported_format(path) {
            return Err(DreqError::UnsupportedFormat {
                path: path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Read the named sheet. A CSV file is a single sheet and the name is ignored.
    pub fn read_sheet(path: &Path, sheet_name: &str) -> Result<Sheet> {
        Self::check_input(path)?;
        if Self::is_csv(path) {
            return Self::read_csv(path);
        }

        let mut workbook = open_workbook_auto(path)?;
        if !workbook.sheet_names().iter().any(|n| n == sheet_name) {
            return Err(DreqError::sheet_not_found(sheet_name));
        }
        let range = workbook.worksheet_range(sheet_name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        log::debug!("Read sheet '{}' from {}", sheet_name, path.display());
        Ok(Sheet {
            name: sheet_name.to_string(),
            rows,
        })
    }

    /// Read the first sheet of a workbook (or a whole CSV file)
    pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
        Self::check_input(path)?;
        if Self::is_csv(path) {
            return Self::read_csv(path);
        }

        let workbook = open_workbook_auto(path)?;
        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DreqError::invalid_input(format!("{} has no sheets", path.display())))?;
        Self::read_sheet(path, &first)
    }

    fn read_csv(path: &Path) -> Result<Sheet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.trim().is_empty() {
                            None
                        } else {
                            Some(CellValue::text(field))
                        }
                    })
                    .collect(),
            );
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!("Read {} CSV rows from {}", rows.len(), path.display());
        Ok(Sheet { name, rows })
    }
}

/// Map a calamine cell onto our cell model; empty cells become `None`
pub fn cell_from_data(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Int(i) => Some(CellValue::Int(*i)),
        Data::Float(f) => Some(CellValue::Float(*f)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        other => Some(CellValue::Text(other.to_string())),
    }
}

/// Character set the text export must fit in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEncoding {
    Ascii,
    Utf8,
}

impl ExportEncoding {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            _ => Err(format!("Invalid encoding: {}. Use 'ascii' or 'utf8'", s)),
        }
    }

    fn can_encode(self, line: &str) -> bool {
        match self {
            Self::Ascii => line.is_ascii(),
            Self::Utf8 => true,
        }
    }
}

/// Outcome of a sheet export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows_written: usize,
    /// Zero-based row where the export gave up, if it did
    pub stopped_at: Option<usize>,
}

/// `<input>.csv` next to the input file
pub fn export_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".csv");
    PathBuf::from(name)
}

/// Row as `", "`-joined text; blank cells print as `None`
pub fn format_row(row: &[Option<CellValue>], sep: &str) -> String {
    row.iter()
        .map(|cell| match cell {
            Some(value) => value.to_string(),
            None => "None".to_string(),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

/// Write every row of `sheet` as one line of `out`.
///
/// A row that cannot be represented in `encoding` is printed value by value
/// to stdout instead, and the export stops there.
pub fn export_sheet<W: Write>(
    sheet: &Sheet,
    out: &mut W,
    encoding: ExportEncoding,
) -> Result<ExportSummary> {
    let mut rows_written = 0;
    for (index, row) in sheet.rows.iter().enumerate() {
        let line = format_row(row, ", ");
        if !encoding.can_encode(&line) {
            log::warn!("Row {} cannot be encoded, dumping it and stopping", index + 1);
            for cell in row {
                match cell {
                    Some(value) => println!("{}", value),
                    None => println!("None"),
                }
            }
            return Ok(ExportSummary {
                rows_written,
                stopped_at: Some(index),
            });
        }
        writeln!(out, "{}", line)?;
        rows_written += 1;
    }
    out.flush()?;

    Ok(ExportSummary {
        rows_written,
        stopped_at: None,
    })
}
