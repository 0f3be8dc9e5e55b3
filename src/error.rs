//! Error types for the payslip engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure that can occur while calculating deductions or
//! rendering payslip documents.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the payslip engine.
///
/// All fallible operations return this error type. Use [`EngineError::category`]
/// to map an error onto the coarse categories shown to users.
///
/// # Example
///
/// ```
/// use payslip_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/statutory.yaml".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Configuration file not found: /missing/statutory.yaml"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but violates a structural rule.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// A description of the violated rule.
        message: String,
    },

    /// A compensation field was missing or invalid.
    #[error("Invalid input field '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A spreadsheet address could not be parsed.
    #[error("Invalid cell address: '{address}'")]
    InvalidCellAddress {
        /// The offending address.
        address: String,
    },

    /// No template asset exists at any of the searched locations.
    #[error("Template not found for design '{design}' (tried: {})", format_paths(.attempted))]
    TemplateNotFound {
        /// The design identifier.
        design: String,
        /// Every path that was checked, in search order.
        attempted: Vec<PathBuf>,
    },

    /// The spreadsheet writer rejected the workbook.
    #[error("Spreadsheet error: {message}")]
    Spreadsheet {
        /// The underlying writer message.
        message: String,
    },

    /// The procedural PDF renderer failed.
    #[error("PDF rendering failed: {message}")]
    PdfRender {
        /// A description of the failure.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The batch archive could not be written.
    #[error("Archive error: {message}")]
    Archive {
        /// The underlying archive message.
        message: String,
    },
}

/// Coarse failure categories reported for single-document operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A required file or asset does not exist.
    NotFound,
    /// The process lacks permission for a path.
    Permission,
    /// Input, configuration, or document content is malformed.
    Format,
    /// Disk or memory was exhausted.
    ResourceExhaustion,
    /// Anything else.
    Generic,
}

impl EngineError {
    /// Builds an [`EngineError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the user-facing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::TemplateNotFound { .. } => {
                ErrorCategory::NotFound
            }
            EngineError::ConfigParseError { .. }
            | EngineError::InvalidConfig { .. }
            | EngineError::InvalidInput { .. }
            | EngineError::InvalidCellAddress { .. }
            | EngineError::Spreadsheet { .. } => ErrorCategory::Format,
            EngineError::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorCategory::NotFound,
                io::ErrorKind::PermissionDenied => ErrorCategory::Permission,
                io::ErrorKind::StorageFull | io::ErrorKind::OutOfMemory => {
                    ErrorCategory::ResourceExhaustion
                }
                _ => ErrorCategory::Generic,
            },
            EngineError::PdfRender { .. } | EngineError::Archive { .. } => ErrorCategory::Generic,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
