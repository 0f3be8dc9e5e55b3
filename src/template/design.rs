//! Template-backed designs.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RenderSettings;
use crate::convert::{ConversionOutcome, FormatConverter};
use crate::design::{DesignRegistry, PayslipDesign};
use crate::error::{EngineError, EngineResult};
use crate::models::PayslipData;
use crate::sheet::{PageSetup, Sheet, write_xlsx};

use super::layout::TemplateLayout;
use super::mapping::{CellMapping, CellMappingResolver};
use super::search::{AssetSearch, DesignAssets};

/// 급여명세서 layout.
pub const TEMPLATE_SAMPLE1: DesignAssets = DesignAssets {
    id: "template_sample1",
    template: "template_sample1.yaml",
    sample_alias: "급여명세서_template.yaml",
    mapping: "template_sample1_mapping.json",
};

/// 임금명세서 layout.
pub const TEMPLATE_SAMPLE2: DesignAssets = DesignAssets {
    id: "template_sample2",
    template: "template_sample2.yaml",
    sample_alias: "임금명세서양식_template3.yaml",
    mapping: "template_sample2_mapping.json",
};

/// Designs shipped with the engine.
pub const BUILTIN_DESIGNS: [DesignAssets; 2] = [TEMPLATE_SAMPLE1, TEMPLATE_SAMPLE2];

/// A design that fills a declarative template through a cell mapping.
///
/// The mapping is loaded once at construction. The template is located and
/// parsed on every render so an asset fixed on disk takes effect without a
/// restart.
pub struct TemplateDesign {
    assets: DesignAssets,
    search: AssetSearch,
    mapping: CellMapping,
    converter: Arc<FormatConverter>,
}

impl std::fmt::Debug for TemplateDesign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDesign")
            .field("id", &self.assets.id)
            .field("mapping_keys", &self.mapping.len())
            .finish()
    }
}

impl TemplateDesign {
    /// Creates a design and loads its mapping.
    ///
    /// A missing mapping file is not an error: the design then fills the
    /// default cell addresses.
    ///
    /// # Errors
    ///
    /// Fails if a mapping file exists but cannot be read or parsed.
    pub fn new(
        assets: DesignAssets,
        settings: &RenderSettings,
        converter: Arc<FormatConverter>,
    ) -> EngineResult<Self> {
        let search = AssetSearch::from_settings(settings);
        let mapping = match search.find_mapping(&assets) {
            Some(path) => CellMapping::load(&path)?,
            None => {
                warn!(design = assets.id, file = assets.mapping, "mapping file not found; using default cells");
                CellMapping::new()
            }
        };
        info!(design = assets.id, keys = mapping.len(), "template design ready");
        Ok(Self {
            assets,
            search,
            mapping,
            converter,
        })
    }

    /// Returns the loaded cell mapping.
    pub fn mapping(&self) -> &CellMapping {
        &self.mapping
    }

    /// Builds the filled sheet for one payslip.
    ///
    /// # Errors
    ///
    /// [`EngineError::TemplateNotFound`] when no template asset exists, or
    /// a parse error for a malformed template.
    pub fn build_sheet(&self, data: PayslipData<'_>) -> EngineResult<Sheet> {
        let path = self.search.find_template(&self.assets)?;
        let layout = TemplateLayout::load(&path)?;
        let mut sheet = layout.to_sheet()?;
        CellMappingResolver::new(&self.mapping).fill(&mut sheet, data);
        sheet.page = PageSetup::single_page(layout.print_area);
        Ok(sheet)
    }
}

impl PayslipDesign for TemplateDesign {
    fn id(&self) -> &str {
        self.assets.id
    }

    fn generate_excel(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<()> {
        let sheet = self.build_sheet(data)?;
        write_xlsx(&sheet, output)?;
        info!(design = self.assets.id, path = %output.display(), "template spreadsheet written");
        Ok(())
    }

    fn generate_pdf(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<ConversionOutcome> {
        let intermediate = self.converter.intermediate_path();
        if let Some(dir) = intermediate.parent() {
            fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
        }
        self.generate_excel(data, &intermediate)?;
        let strategy = self.converter.convert(&intermediate, output, data)?;
        Ok(ConversionOutcome {
            strategy,
            intermediate: Some(intermediate),
        })
    }
}

/// Registers the bundled template designs.
pub fn register_builtin(
    registry: &DesignRegistry,
    settings: &RenderSettings,
    converter: &Arc<FormatConverter>,
) {
    for assets in BUILTIN_DESIGNS {
        let settings = settings.clone();
        let converter = Arc::clone(converter);
        registry.register(assets.id, move || {
            let design = TemplateDesign::new(assets, &settings, Arc::clone(&converter))?;
            Ok(Arc::new(design) as Arc<dyn PayslipDesign>)
        });
    }
}
