//! Batch rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::design::DEFAULT_DESIGN;
use crate::error::{EngineError, EngineResult, ErrorCategory};
use crate::models::{
    CompensationInput, OutputFormat, PayPeriod, PayrollBreakdown, RenderRequest, UniqueStems,
};

use super::activity::{ActivityAction, ActivityEvent};
use super::archive::{archive_name, write_archive};
use super::PayslipService;

/// One employee whose payslip could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Employee name as given in the input.
    pub name: String,
    /// Coarse failure category.
    pub category: ErrorCategory,
    /// Short description.
    pub message: String,
}

impl BatchFailure {
    fn new(name: &str, error: &EngineError) -> Self {
        Self {
            name: name.to_string(),
            category: error.category(),
            message: error.to_string(),
        }
    }
}

/// Sums over the employees that rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchTotals {
    /// Total gross pay.
    pub gross: i64,
    /// Total deductions.
    pub deductions: i64,
    /// Total net pay.
    pub net: i64,
}

impl BatchTotals {
    fn add(&mut self, breakdown: &PayrollBreakdown) {
        self.gross = self.gross.saturating_add(breakdown.gross_pay);
        self.deductions = self.deductions.saturating_add(breakdown.total_deduction);
        self.net = self.net.saturating_add(breakdown.net_pay);
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BatchReport {
    /// Employees in the input.
    pub attempted: usize,
    /// Employees whose documents were written.
    pub succeeded: usize,
    /// Employees that failed, in input order.
    pub failed: Vec<BatchFailure>,
    /// The archive of every written document, if any were written.
    pub archive: Option<PathBuf>,
    /// Amount totals over the succeeded employees.
    pub totals: BatchTotals,
}

impl BatchReport {
    /// Returns true when no employee failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the failed employees.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }
}

/// One record of a batch input file.
#[derive(Debug)]
pub enum BatchEntry {
    /// A record that parsed into an employee.
    Employee(CompensationInput),
    /// A record that could not be parsed; it fails alone in the report.
    Rejected {
        /// The record's `name` field, or a positional label.
        name: String,
        /// Why the record was rejected.
        error: EngineError,
    },
}

/// Parses a JSON array of employee records one record at a time.
///
/// A record that does not deserialize becomes [`BatchEntry::Rejected`]
/// with an [`EngineError::InvalidInput`], so one bad row never hides the
/// others.
///
/// # Errors
///
/// [`EngineError::ConfigParseError`] when `content` is not a JSON array.
pub fn parse_batch_entries(content: &str, origin: &str) -> EngineResult<Vec<BatchEntry>> {
    let records: Vec<Value> =
        serde_json::from_str(content).map_err(|e| EngineError::ConfigParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map_or_else(|| format!("record {}", index + 1), str::to_string);
            match serde_json::from_value::<CompensationInput>(record) {
                Ok(input) => BatchEntry::Employee(input),
                Err(e) => BatchEntry::Rejected {
                    name,
                    error: EngineError::InvalidInput {
                        field: format!("employees[{index}]"),
                        message: e.to_string(),
                    },
                },
            }
        })
        .collect())
}

/// Reads and parses a batch input file with [`parse_batch_entries`].
///
/// # Errors
///
/// [`EngineError::Io`] if the file cannot be read, otherwise as
/// [`parse_batch_entries`].
pub fn read_batch_file(path: &Path) -> EngineResult<Vec<BatchEntry>> {
    let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    parse_batch_entries(&content, &path.display().to_string())
}

impl PayslipService {
    /// Renders one payslip per employee into `out_dir` and archives them.
    ///
    /// Employees are processed in order. A failing employee is recorded in
    /// the report and the loop continues. Employees sharing a name get
    /// distinct files (`<name>_payslip`, `<name>_2_payslip`, ...). The
    /// archive `payslips_<period>_<format>.zip` is written next to the
    /// documents when at least one employee succeeded.
    ///
    /// # Errors
    ///
    /// Only when `out_dir` cannot be created or the archive cannot be
    /// written; per-employee failures are part of the report.
    pub fn render_batch(
        &self,
        employees: &[CompensationInput],
        period: &PayPeriod,
        design: Option<&str>,
        format: OutputFormat,
        out_dir: &Path,
    ) -> EngineResult<BatchReport> {
        self.run_batch(employees.iter().map(Ok::<_, BatchFailure>), period, design, format, out_dir)
    }

    /// Like [`render_batch`](Self::render_batch), over parsed file records.
    ///
    /// Rejected records count as attempted and appear in `failed` at their
    /// input position.
    pub fn render_batch_entries(
        &self,
        entries: &[BatchEntry],
        period: &PayPeriod,
        design: Option<&str>,
        format: OutputFormat,
        out_dir: &Path,
    ) -> EngineResult<BatchReport> {
        let records = entries.iter().map(|entry| match entry {
            BatchEntry::Employee(input) => Ok(input),
            BatchEntry::Rejected { name, error } => Err(BatchFailure::new(name, error)),
        });
        self.run_batch(records, period, design, format, out_dir)
    }

    fn run_batch<'a>(
        &self,
        records: impl ExactSizeIterator<Item = Result<&'a CompensationInput, BatchFailure>>,
        period: &PayPeriod,
        design: Option<&str>,
        format: OutputFormat,
        out_dir: &Path,
    ) -> EngineResult<BatchReport> {
        fs::create_dir_all(out_dir).map_err(|e| EngineError::io(out_dir, e))?;

        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let design_label = design.unwrap_or(DEFAULT_DESIGN);
        info!(
            batch_id = %batch_id,
            employees = records.len(),
            design = design_label,
            format = %format,
            period = period.label(),
            "batch started"
        );

        let mut report = BatchReport {
            attempted: records.len(),
            ..BatchReport::default()
        };
        let mut stems = UniqueStems::default();
        let mut documents = Vec::new();

        for record in records {
            let input = match record {
                Ok(input) => input,
                Err(failure) => {
                    warn!(
                        batch_id = %batch_id,
                        employee = %failure.name,
                        error = %failure.message,
                        "record rejected; continuing batch"
                    );
                    report.failed.push(failure);
                    continue;
                }
            };
            let stem = stems.claim(&input.name);
            match self.render_employee(input, stem, period, design, format, out_dir) {
                Ok((breakdown, files)) => {
                    report.succeeded += 1;
                    report.totals.add(&breakdown);
                    documents.extend(files);
                }
                Err(e) => {
                    warn!(
                        batch_id = %batch_id,
                        employee = %input.name,
                        category = ?e.category(),
                        error = %e,
                        "payslip failed; continuing batch"
                    );
                    report.failed.push(BatchFailure::new(&input.name, &e));
                }
            }
        }

        if !documents.is_empty() {
            let path = out_dir.join(archive_name(period, format));
            write_archive(&path, &documents)?;
            report.archive = Some(path);
        }

        info!(
            batch_id = %batch_id,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        self.notify(&ActivityEvent::new(
            ActivityAction::Batch,
            design_label,
            format,
            report.succeeded,
            report.failed.len(),
        ));
        Ok(report)
    }

    fn render_employee(
        &self,
        input: &CompensationInput,
        stem: String,
        period: &PayPeriod,
        design: Option<&str>,
        format: OutputFormat,
        out_dir: &Path,
    ) -> EngineResult<(PayrollBreakdown, Vec<PathBuf>)> {
        let breakdown = self.calculate(input)?;
        let request = RenderRequest {
            input: input.clone(),
            breakdown,
            period: period.clone(),
            format,
            design: design.map(str::to_string),
            output_dir: out_dir.to_path_buf(),
            file_stem: Some(stem),
        };
        let rendered = self.render_documents(&request)?;
        Ok((breakdown, rendered.files()))
    }
}
