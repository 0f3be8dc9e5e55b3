//! Spreadsheet-to-PDF conversion.
//!
//! [`FormatConverter`] runs an ordered chain of strategies. External tools
//! are tried first (headless office suite, then platform automation); the
//! procedural renderer closes the chain and draws the payslip from the
//! computed values alone. Intermediate failures are logged and absorbed, so
//! a conversion only fails when the procedural renderer itself fails.

mod capability;
mod process;
mod strategy;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RenderSettings;
use crate::error::EngineResult;
use crate::models::PayslipData;
use crate::pdf::ProceduralPdfRenderer;

pub use capability::{Capabilities, Capability};
pub use process::{ProcessOutcome, find_on_path, run_bounded};
pub use strategy::{
    AutomationConversion, ConversionFailure, ConversionStrategy, OfficeConversion, StrategyKind,
};

/// Result of producing a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    /// The strategy whose output became the final file.
    pub strategy: StrategyKind,
    /// The intermediate spreadsheet, retained for diagnostics.
    pub intermediate: Option<PathBuf>,
}

/// Converts rendered spreadsheets to PDF through a fallback chain.
pub struct FormatConverter {
    strategies: Vec<Box<dyn ConversionStrategy>>,
    fallback: Arc<ProceduralPdfRenderer>,
    temp_dir: PathBuf,
}

impl std::fmt::Debug for FormatConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatConverter")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.kind()).collect::<Vec<_>>(),
            )
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl FormatConverter {
    /// Builds the chain from detected capabilities.
    pub fn from_settings(settings: &RenderSettings, fallback: Arc<ProceduralPdfRenderer>) -> Self {
        let capabilities = Capabilities::detect(&settings.converter);
        Self::from_capabilities(&capabilities, settings, fallback)
    }

    /// Builds the chain from already-resolved capabilities.
    pub fn from_capabilities(
        capabilities: &Capabilities,
        settings: &RenderSettings,
        fallback: Arc<ProceduralPdfRenderer>,
    ) -> Self {
        let converter = &settings.converter;
        let mut strategies: Vec<Box<dyn ConversionStrategy>> = Vec::new();

        match &capabilities.office {
            Capability::Available(program) => {
                let mut office = OfficeConversion::new(
                    program.clone(),
                    Duration::from_secs(converter.timeout_secs),
                );
                if let Some(fc_cache) = capabilities.font_cache.available() {
                    office = office.with_font_cache(
                        fc_cache.clone(),
                        Duration::from_secs(converter.font_cache_timeout_secs),
                    );
                }
                strategies.push(Box::new(office));
            }
            Capability::Unavailable { reason } => {
                debug!(reason = %reason, "office conversion unavailable");
            }
        }
        match &capabilities.automation {
            Capability::Available(shell) => strategies.push(Box::new(AutomationConversion::new(
                shell.clone(),
                Duration::from_secs(converter.timeout_secs),
            ))),
            Capability::Unavailable { reason } => {
                debug!(reason = %reason, "automation conversion unavailable");
            }
        }

        Self::with_strategies(strategies, fallback, settings.temp_dir())
    }

    /// Builds a converter with an explicit strategy list.
    pub fn with_strategies(
        strategies: Vec<Box<dyn ConversionStrategy>>,
        fallback: Arc<ProceduralPdfRenderer>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            strategies,
            fallback,
            temp_dir,
        }
    }

    /// Returns a fresh, collision-free path for an intermediate spreadsheet.
    pub fn intermediate_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("payslip-{}.xlsx", Uuid::new_v4().simple()))
    }

    /// Returns the procedural renderer that closes the chain.
    pub fn fallback(&self) -> &Arc<ProceduralPdfRenderer> {
        &self.fallback
    }

    /// Converts `spreadsheet` to a PDF at `output`.
    ///
    /// `data` is what the procedural fallback draws when every external
    /// strategy fails. The spreadsheet is left in place.
    ///
    /// # Errors
    ///
    /// Only when the procedural renderer fails.
    pub fn convert(
        &self,
        spreadsheet: &Path,
        output: &Path,
        data: PayslipData<'_>,
    ) -> EngineResult<StrategyKind> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            debug!(strategy = %kind, input = %spreadsheet.display(), "attempting conversion");
            match strategy.convert(spreadsheet, output) {
                Ok(()) => {
                    info!(strategy = %kind, output = %output.display(), "PDF converted");
                    return Ok(kind);
                }
                Err(failure) => {
                    warn!(strategy = %kind, reason = %failure, "conversion failed; trying next strategy");
                }
            }
        }

        warn!(
            intermediate = %spreadsheet.display(),
            "no external converter succeeded; drawing PDF procedurally"
        );
        self.fallback.draw(data, output)?;
        Ok(StrategyKind::Procedural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatutoryTables;
    use crate::models::{CompensationInput, PayPeriod};
    use crate::pdf::PdfFont;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: Arc<AtomicUsize>,
    }

    impl ConversionStrategy for Failing {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Office
        }

        fn convert(&self, _: &Path, _: &Path) -> Result<(), ConversionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ConversionFailure::Process {
                program: "soffice".to_string(),
                outcome: ProcessOutcome::Timeout,
            })
        }
    }

    struct Copying;

    impl ConversionStrategy for Copying {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Automation
        }

        fn convert(&self, _: &Path, output: &Path) -> Result<(), ConversionFailure> {
            fs::write(output, b"%PDF-1.7 converted").map_err(|source| ConversionFailure::Io {
                path: output.to_path_buf(),
                source,
            })
        }
    }

    fn create_test_fallback() -> Arc<ProceduralPdfRenderer> {
        Arc::new(ProceduralPdfRenderer::with_font(PdfFont::Builtin))
    }

    fn convert_with(strategies: Vec<Box<dyn ConversionStrategy>>) -> (StrategyKind, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let converter =
            FormatConverter::with_strategies(strategies, create_test_fallback(), dir.path().into());
        let spreadsheet = converter.intermediate_path();
        fs::write(&spreadsheet, b"PK").unwrap();
        let output = dir.path().join("out.pdf");

        let input = CompensationInput::new("Hong", 3_000_000);
        let breakdown = crate::calculation::calculate(&input, &StatutoryTables::default());
        let period = PayPeriod::new("2025-01");
        let data = PayslipData {
            input: &input,
            breakdown: &breakdown,
            period: &period,
        };

        let kind = converter.convert(&spreadsheet, &output, data).unwrap();
        assert!(spreadsheet.exists(), "intermediate must be retained");
        (kind, fs::read(&output).unwrap())
    }

    #[test]
    fn test_empty_chain_draws_procedurally() {
        let (kind, bytes) = convert_with(vec![]);
        assert_eq!(kind, StrategyKind::Procedural);
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_failures_advance_to_next_strategy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (kind, bytes) = convert_with(vec![
            Box::new(Failing {
                calls: Arc::clone(&calls),
            }),
            Box::new(Copying),
        ]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(kind, StrategyKind::Automation);
        assert_eq!(bytes, b"%PDF-1.7 converted");
    }

    #[test]
    fn test_all_failing_ends_procedural() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (kind, _) = convert_with(vec![
            Box::new(Failing {
                calls: Arc::clone(&calls),
            }),
            Box::new(Failing {
                calls: Arc::clone(&calls),
            }),
        ]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(kind, StrategyKind::Procedural);
    }

    #[test]
    fn test_intermediate_paths_are_unique() {
        let converter =
            FormatConverter::with_strategies(vec![], create_test_fallback(), PathBuf::from("/tmp"));
        let a = converter.intermediate_path();
        let b = converter.intermediate_path();
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("xlsx"));
    }

    #[test]
    fn test_unavailable_capabilities_build_empty_chain() {
        let converter = FormatConverter::from_capabilities(
            &Capabilities::none(),
            &RenderSettings::default(),
            create_test_fallback(),
        );
        assert!(converter.strategies.is_empty());
    }
}
