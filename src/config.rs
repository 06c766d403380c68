//! Configuration for record derivation, filtering and reporting

use crate::error::{DreqError, Result};
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User-tunable settings. Every field falls back to its default when absent
/// from the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreqConfig {
    /// Active target model; selects `<model>_variable_mapping:` overrides in notes
    pub model: String,
    pub sheet_name: String,
    pub model_levels_marker: String,
    pub orography_code: String,
    pub excluded_components: Vec<String>,
    pub excluded_section: u32,
    pub excluded_codes: Vec<String>,
    pub available_plans: Vec<String>,
    pub excluded_frequencies: Vec<String>,
    pub non_producing_plans: Vec<String>,
    pub deletion_marker: String,
    pub row_validation: RowValidation,
}

/// Structural row check applied while reading a sheet. Off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowValidation {
    pub enabled: bool,
    /// Zero-based column holding a deletion marker
    pub marker_column: usize,
}

impl Default for RowValidation {
    fn default() -> Self {
        Self {
            enabled: false,
            marker_column: 26,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for DreqConfig {
    fn default() -> Self {
        Self {
            model: "HadGEM3".to_string(),
            sheet_name: "Diagnostics".to_string(),
            model_levels_marker: "alev".to_string(),
            orography_code: "m01s00i033".to_string(),
            excluded_components: strings(&["chemistry", "obgc"]),
            excluded_section: 19,
            excluded_codes: strings(&["m01s00i251", "m01s00i252"]),
            available_plans: strings(&[
                "available",
                "post-process",
                "vn10.6",
                "vn10.6.1",
                "vn10.7",
            ]),
            excluded_frequencies: strings(&["fx"]),
            non_producing_plans: strings(&["do-not-produce", "request-error"]),
            deletion_marker: "DELETE".to_string(),
            row_validation: RowValidation::default(),
        }
    }
}

impl DreqConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Write this configuration as pretty JSON
    pub fn save(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(DreqError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        fs::write(path, self.to_json()?)?;
        log::info!("Wrote configuration to {}", path.display());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DreqError::config("model name must not be empty"));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(DreqError::config("sheet name must not be empty"));
        }
        if self.excluded_section > 99 {
            return Err(DreqError::config(format!(
                "excluded section must be a two digit section number, got {}",
                self.excluded_section
            )));
        }
        Ok(())
    }

    /// Compile the derivation rules for the configured model
    pub fn profile(&self) -> Result<ModelProfile> {
        ModelProfile::new(self.clone())
    }
}

/// Compiled derivation rules threaded into record construction.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    config: DreqConfig,
    mapping_override: Regex,
    priority_override: Regex,
    excluded_section_tag: String,
}

impl ModelProfile {
    pub fn new(config: DreqConfig) -> Result<Self> {
        config.validate()?;

        let mapping_pattern = format!("{}_variable_mapping:(.*?):", regex::escape(&config.model));
        let mapping_override = Regex::new(&mapping_pattern)
            .map_err(|e| DreqError::config(format!("bad mapping override pattern: {}", e)))?;
        let priority_override = Regex::new(r"MO_priority:(.*?):")
            .map_err(|e| DreqError::config(format!("bad priority override pattern: {}", e)))?;
        let excluded_section_tag = format!("s{:02}", config.excluded_section);

        Ok(Self {
            config,
            mapping_override,
            priority_override,
            excluded_section_tag,
        })
    }

    pub fn config(&self) -> &DreqConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Mapping expression given for the active model inside `notes`
    pub fn mapping_override<'a>(&self, notes: &'a str) -> Option<&'a str> {
        self.mapping_override
            .captures(notes)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Raw `MO_priority:<n>:` value inside `notes`
    pub fn priority_override<'a>(&self, notes: &'a str) -> Option<&'a str> {
        self.priority_override
            .captures(notes)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    pub fn is_excluded_component(&self, component: &str) -> bool {
        self.config.excluded_components.iter().any(|c| c == component)
    }

    pub fn is_excluded_section(&self, code: &str) -> bool {
        code.contains(&self.excluded_section_tag)
    }

    pub fn is_excluded_code(&self, code: &str) -> bool {
        self.config.excluded_codes.iter().any(|c| c == code)
    }
}
