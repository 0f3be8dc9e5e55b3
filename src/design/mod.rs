//! Payslip designs and their registry.
//!
//! A design turns one employee's computed payslip into documents. The
//! [`DesignRegistry`] maps identifiers to lazily constructed, cached design
//! instances; anything it cannot resolve becomes [`ResolvedDesign::Default`],
//! which callers render with the legacy fixed layout.

mod registry;

use std::path::Path;

use crate::convert::ConversionOutcome;
use crate::error::EngineResult;
use crate::models::PayslipData;

pub use registry::{
    DEFAULT_DESIGN, DEPRECATED_DESIGNS, DesignConstructor, DesignEntry, DesignRegistry,
    ResolvedDesign,
};

/// A visual payslip layout.
pub trait PayslipDesign: Send + Sync {
    /// The design identifier.
    fn id(&self) -> &str;

    /// Writes the payslip as an `.xlsx` file at `output`.
    fn generate_excel(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<()>;

    /// Writes the payslip as a PDF at `output`.
    ///
    /// The outcome names the strategy that produced the file.
    fn generate_pdf(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<ConversionOutcome>;
}
