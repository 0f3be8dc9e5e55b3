//! Configuration loading for the payslip engine.
//!
//! This module loads statutory rate tables (insurance rates and caps, income
//! tax brackets, dependent deductions) and render settings (template search
//! roots, converter and font settings) from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payslip_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config").unwrap();
//! println!("local tax rate: {}", config.statutory().local_tax_rate);
//! ```

mod loader;
mod types;

pub use loader::{ConfigLoader, validate_statutory};
pub use types::{
    ConverterSettings, FontSettings, IncomeTaxTable, InsuranceKind, InsuranceRate,
    InsuranceTable, MAX_DEPENDENT_KEY, RenderSettings, StatutoryTables, TaxBracket,
};
