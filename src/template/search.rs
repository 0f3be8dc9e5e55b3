//! Ordered lookup of design assets.

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::config::RenderSettings;
use crate::error::{EngineError, EngineResult};

/// File names of one design's assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignAssets {
    /// Design identifier.
    pub id: &'static str,
    /// Template file name in the bundled and packaged locations.
    pub template: &'static str,
    /// Template file name in the sample directory.
    pub sample_alias: &'static str,
    /// Mapping file name.
    pub mapping: &'static str,
}

/// Candidate locations for design assets, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSearch {
    designs_dir: PathBuf,
    sample_dir: PathBuf,
    resource_dir: Option<PathBuf>,
}

impl AssetSearch {
    /// Creates a search over the configured asset roots.
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            designs_dir: settings.designs_dir.clone(),
            sample_dir: settings.sample_dir.clone(),
            resource_dir: settings.resource_dir.clone(),
        }
    }

    /// Template candidates: bundled design, sample, packaged resource.
    pub fn template_candidates(&self, assets: &DesignAssets) -> Vec<PathBuf> {
        let mut candidates = vec![
            self.designs_dir.join(assets.template),
            self.sample_dir.join(assets.sample_alias),
        ];
        if let Some(resources) = &self.resource_dir {
            candidates.push(resources.join("designs").join(assets.template));
        }
        candidates
    }

    /// Mapping candidates: packaged resource, then bundled design.
    pub fn mapping_candidates(&self, assets: &DesignAssets) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(resources) = &self.resource_dir {
            candidates.push(resources.join("designs").join("configs").join(assets.mapping));
        }
        candidates.push(self.designs_dir.join("configs").join(assets.mapping));
        candidates
    }

    /// Returns the design's template path.
    ///
    /// # Errors
    ///
    /// [`EngineError::TemplateNotFound`] listing every candidate when none exists.
    pub fn find_template(&self, assets: &DesignAssets) -> EngineResult<PathBuf> {
        let candidates = self.template_candidates(assets);
        match first_existing(&candidates) {
            Some(path) => {
                info!(design = assets.id, path = %path.display(), "template found");
                Ok(path)
            }
            None => {
                error!(design = assets.id, attempted = candidates.len(), "template not found");
                Err(EngineError::TemplateNotFound {
                    design: assets.id.to_string(),
                    attempted: candidates,
                })
            }
        }
    }

    /// Returns the design's mapping path, if any candidate exists.
    pub fn find_mapping(&self, assets: &DesignAssets) -> Option<PathBuf> {
        first_existing(&self.mapping_candidates(assets))
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find_map(|path| {
        let found = path.is_file();
        debug!(path = %path.display(), found, "asset candidate");
        found.then(|| path.clone())
    })
}
