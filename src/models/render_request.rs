//! Render request and output format.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CompensationInput, PayPeriod, PayrollBreakdown};

/// The document formats a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Spreadsheet only.
    #[default]
    Excel,
    /// PDF only.
    Pdf,
    /// Spreadsheet and PDF.
    Both,
}

impl OutputFormat {
    /// Returns true if a spreadsheet is requested.
    pub fn wants_excel(self) -> bool {
        matches!(self, OutputFormat::Excel | OutputFormat::Both)
    }

    /// Returns true if a PDF is requested.
    pub fn wants_pdf(self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Both)
    }

    /// Returns the lowercase name used in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Excel => "excel",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Both => "both",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(OutputFormat::Excel),
            "pdf" => Ok(OutputFormat::Pdf),
            "both" => Ok(OutputFormat::Both),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Borrowed view of the values one payslip document shows.
#[derive(Debug, Clone, Copy)]
pub struct PayslipData<'a> {
    /// Employee input.
    pub input: &'a CompensationInput,
    /// Calculated amounts.
    pub breakdown: &'a PayrollBreakdown,
    /// Pay period.
    pub period: &'a PayPeriod,
}

/// Everything needed to render one employee's payslip.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// The employee input the breakdown was computed from.
    pub input: CompensationInput,
    /// The computed breakdown.
    pub breakdown: PayrollBreakdown,
    /// The pay period.
    pub period: PayPeriod,
    /// Requested formats.
    pub format: OutputFormat,
    /// Design identifier; `None` means the default layout.
    pub design: Option<String>,
    /// Directory the documents are written to.
    pub output_dir: PathBuf,
    /// File name stem; `None` derives it from the employee name.
    pub file_stem: Option<String>,
}

impl RenderRequest {
    /// Returns the document view of this request.
    pub fn data(&self) -> PayslipData<'_> {
        PayslipData {
            input: &self.input,
            breakdown: &self.breakdown,
            period: &self.period,
        }
    }

    /// Returns the output path for one extension, `<dir>/<stem>_payslip.<ext>`.
    pub fn output_path(&self, extension: &str) -> PathBuf {
        let stem = self.file_stem.as_deref().unwrap_or(&self.input.name);
        payslip_path(&self.output_dir, stem, extension)
    }
}

/// Returns the file name stem for an employee name: the name made safe for
/// the filesystem, or `employee` when nothing is left.
pub fn payslip_stem(name: &str) -> String {
    let stem = sanitize_filename::sanitize(name.trim());
    if stem.is_empty() {
        "employee".to_string()
    } else {
        stem
    }
}

/// Builds `<dir>/<name>_payslip.<ext>` with the name made safe for the filesystem.
pub fn payslip_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_payslip.{extension}", payslip_stem(name)))
}

/// Hands out file stems that are unique within one output directory.
///
/// The first employee with a given name keeps the plain stem; later ones
/// get `_2`, `_3`, and so on.
#[derive(Debug, Default)]
pub struct UniqueStems {
    used: HashSet<String>,
}

impl UniqueStems {
    /// Returns an unused stem for `name` and marks it used.
    ///
    /// # Examples
    ///
    /// ```
    /// use payslip_engine::models::UniqueStems;
    ///
    /// let mut stems = UniqueStems::default();
    /// assert_eq!(stems.claim("김민수"), "김민수");
    /// assert_eq!(stems.claim("김민수"), "김민수_2");
    /// ```
    pub fn claim(&mut self, name: &str) -> String {
        let base = payslip_stem(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while !self.used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        candidate
    }
}
