//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading statutory rate
//! tables and render settings from YAML files.

use std::fs;
use std::io;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

use super::types::{RenderSettings, StatutoryTables, TaxBracket};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── statutory.yaml   # Insurance rates, tax brackets, dependent table
/// └── renderer.yaml    # Template search roots, converter and font settings
/// ```
///
/// # Example
///
/// ```no_run
/// use payslip_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config").unwrap();
/// println!("{} tax brackets", loader.statutory().income_tax.brackets.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    statutory: StatutoryTables,
    render: RenderSettings,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - Either file is missing, or exists but cannot be read
    /// - Either file contains invalid YAML
    /// - The tax brackets are not contiguous
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let statutory = Self::load_statutory(path.join("statutory.yaml"))?;
        let render = Self::load_yaml::<RenderSettings>(&path.join("renderer.yaml"))?;

        debug!(dir = %path.display(), "configuration loaded");
        Ok(Self { statutory, render })
    }

    /// Builds a loader from already-constructed values.
    pub fn from_parts(statutory: StatutoryTables, render: RenderSettings) -> Self {
        Self { statutory, render }
    }

    /// Loads and validates a single statutory table file.
    pub fn load_statutory<P: AsRef<Path>>(path: P) -> EngineResult<StatutoryTables> {
        let tables = Self::load_yaml::<StatutoryTables>(path.as_ref())?;
        validate_statutory(&tables)?;
        Ok(tables)
    }

    /// Returns the statutory rate tables.
    pub fn statutory(&self) -> &StatutoryTables {
        &self.statutory
    }

    /// Returns the render settings.
    pub fn render(&self) -> &RenderSettings {
        &self.render
    }

    /// Loads and parses a YAML file.
    ///
    /// A missing file is [`EngineError::ConfigNotFound`]; any other read
    /// failure keeps its I/O error.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EngineError::ConfigNotFound {
                path: path_str.clone(),
            },
            _ => EngineError::io(path, e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }
}

/// Checks the structural rules of a statutory table.
///
/// The first bracket must start at 0, each bracket must start where the
/// previous one ended, and only the final bracket may be open-ended.
/// A jump in tax owed at a boundary is logged but accepted.
pub fn validate_statutory(tables: &StatutoryTables) -> EngineResult<()> {
    let brackets = &tables.income_tax.brackets;

    let Some(first) = brackets.first() else {
        return Err(invalid("income_tax.brackets must not be empty"));
    };
    if first.start != 0 {
        return Err(invalid("the first tax bracket must start at 0"));
    }

    for (index, pair) in brackets.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let Some(end) = current.end else {
            return Err(invalid(&format!(
                "tax bracket {index} is open-ended but is not the last bracket"
            )));
        };
        if end <= current.start {
            return Err(invalid(&format!("tax bracket {index} has end <= start")));
        }
        if next.start != end {
            return Err(invalid(&format!(
                "tax bracket {} starts at {} but the previous bracket ends at {end}",
                index + 1,
                next.start
            )));
        }
        if tax_at(current, end) != tax_at(next, end) {
            warn!(
                boundary = end,
                "income tax is discontinuous at bracket boundary"
            );
        }
    }

    if brackets.last().is_some_and(|b| b.end.is_some()) {
        return Err(invalid("the last tax bracket must be open-ended"));
    }

    for (field, rate) in [
        ("insurance.national_pension.rate", tables.insurance.national_pension.rate),
        ("insurance.health_insurance.rate", tables.insurance.health_insurance.rate),
        (
            "insurance.employment_insurance.rate",
            tables.insurance.employment_insurance.rate,
        ),
        ("insurance.long_term_care_rate", tables.insurance.long_term_care_rate),
        ("local_tax_rate", tables.local_tax_rate),
    ] {
        if rate.is_sign_negative() {
            return Err(invalid(&format!("{field} must not be negative")));
        }
    }

    Ok(())
}

fn tax_at(bracket: &TaxBracket, taxable: i64) -> Option<i64> {
    (Decimal::from(taxable) * bracket.rate - Decimal::from(bracket.deduction))
        .floor()
        .to_i64()
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidConfig {
        message: message.to_string(),
    }
}
