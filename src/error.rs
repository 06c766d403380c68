//! Error types for dreqdiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DreqError>;

#[derive(Error, Debug)]
pub enum DreqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Missing required column(s): {}", titles.join(", "))]
    MissingColumns { titles: Vec<String> },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Sheet has no header row: {name}")]
    EmptySheet { name: String },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl DreqError {
    pub fn missing_columns(titles: Vec<String>) -> Self {
        Self::MissingColumns { titles }
    }

    pub fn sheet_not_found(name: impl Into<String>) -> Self {
        Self::SheetNotFound { name: name.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Structural errors mean the data source does not look like a request table.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingColumns { .. }
                | Self::SheetNotFound { .. }
                | Self::EmptySheet { .. }
                | Self::Workbook(_)
                | Self::UnsupportedFormat { .. }
        )
    }
}
