//! Spreadsheet-to-PDF conversion strategies backed by external tools.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::process::{ProcessOutcome, run_bounded};

/// Which strategy produced a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Headless office suite.
    Office,
    /// Platform spreadsheet automation.
    Automation,
    /// Procedural drawing without the template.
    Procedural,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Office => "office",
            StrategyKind::Automation => "automation",
            StrategyKind::Procedural => "procedural",
        })
    }
}

/// Why a conversion strategy did not produce a PDF.
///
/// These never reach callers of the converter; they are logged and the
/// chain advances.
#[derive(Debug, Error)]
pub enum ConversionFailure {
    /// The external process did not succeed.
    #[error("{program} {outcome}")]
    Process {
        /// The program that was run.
        program: String,
        /// How it ended.
        outcome: ProcessOutcome,
    },
    /// The process succeeded but the expected file is absent.
    #[error("expected output missing at '{}'", .path.display())]
    MissingOutput {
        /// Where the output should have been.
        path: PathBuf,
    },
    /// Moving the produced file into place failed.
    #[error("could not place output at '{}': {source}", .path.display())]
    Io {
        /// The destination path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// One step of the conversion chain.
pub trait ConversionStrategy: Send + Sync {
    /// Identifies the strategy in logs and outcomes.
    fn kind(&self) -> StrategyKind;

    /// Converts `spreadsheet` into a PDF at `output`.
    fn convert(&self, spreadsheet: &Path, output: &Path) -> Result<(), ConversionFailure>;
}

/// Converts through a headless office suite.
#[derive(Debug, Clone)]
pub struct OfficeConversion {
    program: PathBuf,
    timeout: Duration,
    font_cache: Option<(PathBuf, Duration)>,
}

impl OfficeConversion {
    /// Creates the strategy for an office executable.
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self {
            program,
            timeout,
            font_cache: None,
        }
    }

    /// Refreshes the system font cache with `program` before each conversion.
    pub fn with_font_cache(mut self, program: PathBuf, timeout: Duration) -> Self {
        self.font_cache = Some((program, timeout));
        self
    }

    fn refresh_font_cache(&self) {
        let Some((program, timeout)) = &self.font_cache else {
            return;
        };
        let mut command = Command::new(program);
        command.arg("-f");
        let outcome = run_bounded(command, *timeout);
        debug!(outcome = %outcome, "font cache refresh");
    }
}

impl ConversionStrategy for OfficeConversion {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Office
    }

    fn convert(&self, spreadsheet: &Path, output: &Path) -> Result<(), ConversionFailure> {
        let out_dir = parent_dir(output);
        fs::create_dir_all(&out_dir).map_err(|source| ConversionFailure::Io {
            path: out_dir.clone(),
            source,
        })?;

        self.refresh_font_cache();

        // The suite writes next to the spreadsheet; only a finished PDF is
        // moved into the output directory.
        let staging = parent_dir(spreadsheet);
        let stem = spreadsheet
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = staging.join(format!("{stem}.pdf"));

        let mut command = Command::new(&self.program);
        command
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(&staging)
            .arg(spreadsheet)
            .env("SAL_USE_VCLPLUGIN", "gen");
        info!(program = %self.program.display(), input = %spreadsheet.display(), "converting with office suite");
        let outcome = run_bounded(command, self.timeout);
        if !outcome.is_success() {
            discard(&produced);
            return Err(ConversionFailure::Process {
                program: self.program.display().to_string(),
                outcome,
            });
        }

        if !produced.is_file() {
            return Err(ConversionFailure::MissingOutput { path: produced });
        }
        move_into_place(&produced, output).inspect_err(|_| discard(&produced))
    }
}

/// Converts through spreadsheet automation driven by PowerShell.
#[derive(Debug, Clone)]
pub struct AutomationConversion {
    shell: PathBuf,
    timeout: Duration,
}

impl AutomationConversion {
    /// Creates the strategy for a PowerShell executable.
    pub fn new(shell: PathBuf, timeout: Duration) -> Self {
        Self { shell, timeout }
    }
}

impl ConversionStrategy for AutomationConversion {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Automation
    }

    fn convert(&self, spreadsheet: &Path, output: &Path) -> Result<(), ConversionFailure> {
        let input = absolute(spreadsheet);
        let target = absolute(output);
        let mut command = Command::new(&self.shell);
        command
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(export_script(&input, &target));
        let outcome = run_bounded(command, self.timeout);
        if !outcome.is_success() {
            return Err(ConversionFailure::Process {
                program: self.shell.display().to_string(),
                outcome,
            });
        }
        if !target.is_file() {
            return Err(ConversionFailure::MissingOutput { path: target });
        }
        Ok(())
    }
}

/// Builds the PowerShell script that exports a workbook as PDF.
fn export_script(input: &Path, output: &Path) -> String {
    format!(
        "$excel = New-Object -ComObject Excel.Application; \
         $excel.Visible = $false; $excel.DisplayAlerts = $false; \
         try {{ $wb = $excel.Workbooks.Open('{}'); $wb.ExportAsFixedFormat(0, '{}'); $wb.Close($false) }} \
         finally {{ $excel.Quit() }}",
        quote_single(input),
        quote_single(output)
    )
}

fn quote_single(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Removes a partial conversion result, if the tool left one.
fn discard(produced: &Path) {
    if produced.is_file() {
        match fs::remove_file(produced) {
            Ok(()) => debug!(file = %produced.display(), "discarded partial conversion output"),
            Err(e) => warn!(file = %produced.display(), error = %e, "could not discard partial output"),
        }
    }
}

fn move_into_place(produced: &Path, output: &Path) -> Result<(), ConversionFailure> {
    if produced == output {
        return Ok(());
    }
    let io_error = |source| ConversionFailure::Io {
        path: output.to_path_buf(),
        source,
    };
    if output.exists() {
        fs::remove_file(output).map_err(io_error)?;
    }
    if fs::rename(produced, output).is_err() {
        fs::copy(produced, output).map_err(io_error)?;
        let _ = fs::remove_file(produced);
    }
    Ok(())
}
