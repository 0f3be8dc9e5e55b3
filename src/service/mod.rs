//! Payslip rendering service.
//!
//! [`PayslipService`] ties the engine together: it validates input, runs the
//! calculator, resolves a design through the registry, writes the requested
//! documents, and falls back to the legacy layout when a template design
//! cannot be used. Batch rendering lives in the `batch` submodule.
//!
//! # Example
//!
//! ```no_run
//! use payslip_engine::config::ConfigLoader;
//! use payslip_engine::models::{CompensationInput, OutputFormat, PayPeriod};
//! use payslip_engine::service::PayslipService;
//!
//! let service = PayslipService::new(ConfigLoader::load("./config").unwrap());
//! let employees = vec![CompensationInput::new("홍길동", 3_000_000)];
//! let report = service
//!     .render_batch(
//!         &employees,
//!         &PayPeriod::new("2025-01"),
//!         Some("template_sample1"),
//!         OutputFormat::Both,
//!         "./out".as_ref(),
//!     )
//!     .unwrap();
//! println!("{} of {} rendered", report.succeeded, report.attempted);
//! ```

mod activity;
mod archive;
mod batch;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::calculation::calculate;
use crate::config::ConfigLoader;
use crate::convert::{ConversionOutcome, FormatConverter};
use crate::design::{DEFAULT_DESIGN, DesignRegistry, PayslipDesign, ResolvedDesign};
use crate::error::{EngineError, EngineResult};
use crate::models::{CompensationInput, PayrollBreakdown, RenderRequest};
use crate::pdf::ProceduralPdfRenderer;
use crate::template::{LegacyDesign, register_builtin};

pub use activity::{ActivityAction, ActivityError, ActivityEvent, ActivitySink, JsonLinesActivity, NoopActivity};
pub use archive::{archive_name, write_archive};
pub use batch::{
    BatchEntry, BatchFailure, BatchReport, BatchTotals, parse_batch_entries, read_batch_file,
};

/// Documents written for one payslip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPayslip {
    /// Identifier of the design that was resolved.
    pub design: String,
    /// True if the resolved design failed and the legacy layout was used.
    pub used_legacy_fallback: bool,
    /// The spreadsheet, when requested.
    pub excel: Option<PathBuf>,
    /// The PDF, when requested.
    pub pdf: Option<PathBuf>,
    /// How the PDF was produced.
    pub conversion: Option<ConversionOutcome>,
}

impl RenderedPayslip {
    /// Every document written, spreadsheet first.
    pub fn files(&self) -> Vec<PathBuf> {
        self.excel.iter().chain(self.pdf.iter()).cloned().collect()
    }
}

/// Errors a template design may raise that the legacy layout can recover from.
fn recoverable_by_legacy(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::TemplateNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidCellAddress { .. }
            | EngineError::Spreadsheet { .. }
    )
}

/// Shared rendering service.
///
/// Cheap to clone; clones share the registry, its cached designs and the
/// converter.
#[derive(Clone)]
pub struct PayslipService {
    config: Arc<ConfigLoader>,
    registry: Arc<DesignRegistry>,
    converter: Arc<FormatConverter>,
    legacy: LegacyDesign,
    activity: Arc<dyn ActivitySink>,
}

impl std::fmt::Debug for PayslipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayslipService")
            .field("registry", &self.registry)
            .field("converter", &self.converter)
            .finish()
    }
}

impl PayslipService {
    /// Creates a service, detecting converter capabilities and registering
    /// the bundled designs.
    pub fn new(config: ConfigLoader) -> Self {
        let settings = config.render();
        let renderer = Arc::new(ProceduralPdfRenderer::new(&settings.fonts));
        let converter = FormatConverter::from_settings(settings, renderer);
        Self::with_converter(config, converter)
    }

    /// Creates a service around an already-built converter.
    pub fn with_converter(config: ConfigLoader, converter: FormatConverter) -> Self {
        let converter = Arc::new(converter);
        let registry = DesignRegistry::new();
        register_builtin(&registry, config.render(), &converter);
        let legacy = LegacyDesign::new(Arc::clone(converter.fallback()));
        info!(designs = ?registry.list_available(), converter = ?converter, "payslip service ready");
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            converter,
            legacy,
            activity: Arc::new(NoopActivity),
        }
    }

    /// Replaces the activity sink.
    pub fn with_activity(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity = sink;
        self
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the design registry.
    pub fn registry(&self) -> &DesignRegistry {
        &self.registry
    }

    /// Validates `input` and computes its breakdown.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] for an empty name, a base salary that is
    /// not positive, or an amount that is negative or above the ceiling.
    pub fn calculate(&self, input: &CompensationInput) -> EngineResult<PayrollBreakdown> {
        input.validate()?;
        Ok(calculate(input, self.config.statutory()))
    }

    /// Writes the documents for one request.
    ///
    /// Unknown, deprecated and unavailable design identifiers render the
    /// legacy layout. A template design whose assets are missing or
    /// malformed also falls back to the legacy layout for that document.
    ///
    /// # Errors
    ///
    /// Filesystem failures, and any failure of the legacy layout itself.
    pub fn render(&self, request: &RenderRequest) -> EngineResult<RenderedPayslip> {
        let result = self.render_documents(request);
        let (succeeded, failed) = if result.is_ok() { (1, 0) } else { (0, 1) };
        self.notify(&ActivityEvent::new(
            ActivityAction::Render,
            request.design.as_deref().unwrap_or(DEFAULT_DESIGN),
            request.format,
            succeeded,
            failed,
        ));
        result
    }

    fn render_documents(&self, request: &RenderRequest) -> EngineResult<RenderedPayslip> {
        fs::create_dir_all(&request.output_dir)
            .map_err(|e| EngineError::io(&request.output_dir, e))?;

        let resolved = self.registry.get(request.design.as_deref());
        let design: &dyn PayslipDesign = match &resolved {
            ResolvedDesign::Design(design) => design.as_ref(),
            ResolvedDesign::Default => &self.legacy,
        };
        let data = request.data();
        let mut rendered = RenderedPayslip {
            design: design.id().to_string(),
            used_legacy_fallback: false,
            excel: None,
            pdf: None,
            conversion: None,
        };

        if request.format.wants_excel() {
            let path = request.output_path("xlsx");
            let ((), fell_back) =
                self.with_legacy_fallback(design, |d| d.generate_excel(data, &path))?;
            rendered.used_legacy_fallback |= fell_back;
            rendered.excel = Some(path);
        }
        if request.format.wants_pdf() {
            let path = request.output_path("pdf");
            let (outcome, fell_back) =
                self.with_legacy_fallback(design, |d| d.generate_pdf(data, &path))?;
            rendered.used_legacy_fallback |= fell_back;
            rendered.pdf = Some(path);
            rendered.conversion = Some(outcome);
        }

        info!(
            design = %rendered.design,
            legacy_fallback = rendered.used_legacy_fallback,
            files = rendered.files().len(),
            "payslip rendered"
        );
        Ok(rendered)
    }

    fn with_legacy_fallback<T>(
        &self,
        design: &dyn PayslipDesign,
        op: impl Fn(&dyn PayslipDesign) -> EngineResult<T>,
    ) -> EngineResult<(T, bool)> {
        match op(design) {
            Err(e) if recoverable_by_legacy(&e) && design.id() != DEFAULT_DESIGN => {
                warn!(design = design.id(), error = %e, "design failed; rendering legacy layout");
                op(&self.legacy).map(|value| (value, true))
            }
            other => other.map(|value| (value, false)),
        }
    }

    fn notify(&self, event: &ActivityEvent) {
        if let Err(e) = self.activity.record(event) {
            warn!(action = ?event.action, error = %e, "activity sink failed; ignoring");
        }
    }
}
