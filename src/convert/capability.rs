//! External tool capabilities, resolved once.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::ConverterSettings;

use super::process::find_on_path;

const FONT_CACHE_PROGRAM: &str = "fc-cache";
const POWERSHELL_PROGRAM: &str = "powershell";

/// Whether an optional external capability can be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    /// The capability is present.
    Available(T),
    /// The capability is absent, with the reason.
    Unavailable {
        /// Why the capability cannot be used.
        reason: String,
    },
}

impl<T> Capability<T> {
    fn unavailable(reason: impl Into<String>) -> Self {
        Capability::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns the value if available.
    pub fn available(&self) -> Option<&T> {
        match self {
            Capability::Available(value) => Some(value),
            Capability::Unavailable { .. } => None,
        }
    }

    /// Returns true if available.
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

/// The external tools the converter may drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Headless office suite executable.
    pub office: Capability<PathBuf>,
    /// System font cache refresher.
    pub font_cache: Capability<PathBuf>,
    /// Shell used for platform spreadsheet automation.
    pub automation: Capability<PathBuf>,
}

impl Capabilities {
    /// Resolves every capability from `settings`.
    ///
    /// The office suite is looked up on `PATH` by each configured program
    /// name, then at each known install location.
    pub fn detect(settings: &ConverterSettings) -> Self {
        let capabilities = Self {
            office: detect_office(settings),
            font_cache: detect_font_cache(settings),
            automation: detect_automation(settings),
        };
        info!(
            office = capabilities.office.is_available(),
            font_cache = capabilities.font_cache.is_available(),
            automation = capabilities.automation.is_available(),
            "converter capabilities detected"
        );
        capabilities
    }

    /// Capabilities with every external tool unavailable.
    pub fn none() -> Self {
        Self {
            office: Capability::unavailable("disabled"),
            font_cache: Capability::unavailable("disabled"),
            automation: Capability::unavailable("disabled"),
        }
    }
}

fn detect_office(settings: &ConverterSettings) -> Capability<PathBuf> {
    if settings.search_path {
        for name in &settings.program_names {
            if let Some(path) = find_on_path(name) {
                debug!(path = %path.display(), "office suite found on PATH");
                return Capability::Available(path);
            }
        }
    }
    for path in &settings.known_locations {
        if path.is_file() {
            debug!(path = %path.display(), "office suite found at known location");
            return Capability::Available(path.clone());
        }
    }
    Capability::unavailable(format!(
        "none of {:?} on PATH and no known install location exists",
        settings.program_names
    ))
}

fn detect_font_cache(settings: &ConverterSettings) -> Capability<PathBuf> {
    if !settings.refresh_font_cache {
        return Capability::unavailable("font cache refresh disabled");
    }
    if !settings.search_path {
        return Capability::unavailable("PATH search disabled");
    }
    match find_on_path(FONT_CACHE_PROGRAM) {
        Some(path) => Capability::Available(path),
        None => Capability::unavailable("fc-cache not installed"),
    }
}

fn detect_automation(settings: &ConverterSettings) -> Capability<PathBuf> {
    if !cfg!(windows) {
        return Capability::unavailable("spreadsheet automation requires Windows");
    }
    if !settings.automation_enabled {
        return Capability::unavailable("automation disabled");
    }
    match find_on_path(POWERSHELL_PROGRAM) {
        Some(path) => Capability::Available(path),
        None => Capability::unavailable("powershell not found"),
    }
}
