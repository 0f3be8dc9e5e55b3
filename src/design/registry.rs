//! Concurrency-safe design registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::error::EngineResult;

use super::PayslipDesign;

/// Identifier that always selects the legacy layout.
pub const DEFAULT_DESIGN: &str = "default";

/// Retired identifiers, kept so old requests still render.
pub const DEPRECATED_DESIGNS: [&str; 2] = ["design_1", "design_2"];

/// Builds a design instance.
pub type DesignConstructor =
    Arc<dyn Fn() -> EngineResult<Arc<dyn PayslipDesign>> + Send + Sync>;

/// How a design identifier is registered.
#[derive(Clone)]
pub enum DesignEntry {
    /// The design can be constructed.
    Available(DesignConstructor),
    /// The design is known but cannot be used in this build.
    Unavailable {
        /// Why it cannot be used.
        reason: String,
    },
}

impl std::fmt::Debug for DesignEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesignEntry::Available(_) => f.write_str("Available"),
            DesignEntry::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            }
        }
    }
}

/// Result of a registry lookup.
#[derive(Clone)]
pub enum ResolvedDesign {
    /// A constructed design.
    Design(Arc<dyn PayslipDesign>),
    /// No design; render with the legacy layout.
    Default,
}

impl ResolvedDesign {
    /// Returns true for [`ResolvedDesign::Default`].
    pub fn is_default(&self) -> bool {
        matches!(self, ResolvedDesign::Default)
    }
}

impl std::fmt::Debug for ResolvedDesign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedDesign::Design(design) => f.debug_tuple("Design").field(&design.id()).finish(),
            ResolvedDesign::Default => f.write_str("Default"),
        }
    }
}

type InstanceCell = Arc<Mutex<Option<Arc<dyn PayslipDesign>>>>;

struct Slot {
    entry: DesignEntry,
    instance: InstanceCell,
}

/// Maps design identifiers to cached instances.
///
/// Lookups take a shared lock on the map. First construction of an
/// identifier holds that identifier's own mutex, so concurrent first
/// requests build exactly one instance.
#[derive(Default)]
pub struct DesignRegistry {
    slots: RwLock<HashMap<String, Slot>>,
}

impl std::fmt::Debug for DesignRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.read();
        let mut ids: Vec<&String> = slots.keys().collect();
        ids.sort();
        f.debug_struct("DesignRegistry").field("ids", &ids).finish()
    }
}

impl DesignRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a design constructor, replacing any previous registration
    /// and discarding its cached instance.
    pub fn register<F>(&self, id: impl Into<String>, constructor: F)
    where
        F: Fn() -> EngineResult<Arc<dyn PayslipDesign>> + Send + Sync + 'static,
    {
        self.insert(id.into(), DesignEntry::Available(Arc::new(constructor)));
    }

    /// Registers an identifier whose design cannot be used.
    pub fn register_unavailable(&self, id: impl Into<String>, reason: impl Into<String>) {
        self.insert(
            id.into(),
            DesignEntry::Unavailable {
                reason: reason.into(),
            },
        );
    }

    fn insert(&self, id: String, entry: DesignEntry) {
        let replaced = self.slots.write().insert(
            id.clone(),
            Slot {
                entry,
                instance: Arc::new(Mutex::new(None)),
            },
        );
        if replaced.is_some() {
            info!(design = %id, "design re-registered; cached instance discarded");
        }
    }

    /// Resolves a design identifier.
    ///
    /// `None`, empty, `"default"`, deprecated, unknown, unavailable and
    /// failed-to-construct identifiers all resolve to
    /// [`ResolvedDesign::Default`]; this never fails.
    pub fn get(&self, id: Option<&str>) -> ResolvedDesign {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            return ResolvedDesign::Default;
        };
        if id == DEFAULT_DESIGN {
            return ResolvedDesign::Default;
        }
        if DEPRECATED_DESIGNS.contains(&id) {
            warn!(design = %id, "design identifier is deprecated; using default layout");
            return ResolvedDesign::Default;
        }

        let (constructor, cell) = {
            let slots = self.slots.read();
            let Some(slot) = slots.get(id) else {
                warn!(design = %id, "unknown design identifier; using default layout");
                return ResolvedDesign::Default;
            };
            match &slot.entry {
                DesignEntry::Available(constructor) => {
                    (Arc::clone(constructor), Arc::clone(&slot.instance))
                }
                DesignEntry::Unavailable { reason } => {
                    error!(design = %id, reason = %reason, "design unavailable; using default layout");
                    return ResolvedDesign::Default;
                }
            }
        };

        let mut instance = cell.lock();
        if let Some(design) = instance.as_ref() {
            return ResolvedDesign::Design(Arc::clone(design));
        }
        match constructor() {
            Ok(design) => {
                info!(design = %id, "design constructed");
                *instance = Some(Arc::clone(&design));
                ResolvedDesign::Design(design)
            }
            Err(e) => {
                error!(design = %id, error = %e, "design construction failed; using default layout");
                ResolvedDesign::Default
            }
        }
    }

    /// Returns the identifiers that can be constructed, sorted.
    pub fn list_available(&self) -> Vec<String> {
        let slots = self.slots.read();
        let mut ids: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot.entry, DesignEntry::Available(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns true if `id` has a cached instance.
    pub fn is_cached(&self, id: &str) -> bool {
        self.slots
            .read()
            .get(id)
            .is_some_and(|slot| slot.instance.lock().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConversionOutcome, StrategyKind};
    use crate::error::EngineError;
    use crate::models::PayslipData;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubDesign {
        id: String,
    }

    impl PayslipDesign for StubDesign {
        fn id(&self) -> &str {
            &self.id
        }

        fn generate_excel(&self, _: PayslipData<'_>, _: &Path) -> EngineResult<()> {
            Ok(())
        }

        fn generate_pdf(&self, _: PayslipData<'_>, _: &Path) -> EngineResult<ConversionOutcome> {
            Ok(ConversionOutcome {
                strategy: StrategyKind::Procedural,
                intermediate: None,
            })
        }
    }

    fn register_counting(registry: &DesignRegistry, id: &'static str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        registry.register(id, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubDesign { id: id.to_string() }) as Arc<dyn PayslipDesign>)
        });
        count
    }

    fn resolved_id(resolved: &ResolvedDesign) -> Option<String> {
        match resolved {
            ResolvedDesign::Design(design) => Some(design.id().to_string()),
            ResolvedDesign::Default => None,
        }
    }

    #[test]
    fn test_default_and_none_resolve_to_default() {
        let registry = DesignRegistry::new();
        register_counting(&registry, "template_sample1");
        assert!(registry.get(None).is_default());
        assert!(registry.get(Some("default")).is_default());
        assert!(registry.get(Some("  ")).is_default());
    }

    #[test]
    fn test_deprecated_ids_resolve_to_default_without_construction() {
        let registry = DesignRegistry::new();
        let count = register_counting(&registry, "design_1");
        assert!(registry.get(Some("design_1")).is_default());
        assert!(registry.get(Some("design_2")).is_default());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_id_resolves_to_default() {
        let registry = DesignRegistry::new();
        assert!(registry.get(Some("template_sample9")).is_default());
    }

    #[test]
    fn test_construction_is_cached() {
        let registry = DesignRegistry::new();
        let count = register_counting(&registry, "template_sample1");

        let first = registry.get(Some("template_sample1"));
        let second = registry.get(Some("template_sample1"));

        assert_eq!(resolved_id(&first).as_deref(), Some("template_sample1"));
        match (first, second) {
            (ResolvedDesign::Design(a), ResolvedDesign::Design(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("expected two designs, got {other:?}"),
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_cached("template_sample1"));
    }

    #[test]
    fn test_concurrent_first_requests_construct_once() {
        let registry = DesignRegistry::new();
        let count = register_counting(&registry, "template_sample2");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert!(!registry.get(Some("template_sample2")).is_default());
                });
            }
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_construction_resolves_to_default() {
        let registry = DesignRegistry::new();
        registry.register("broken", || {
            Err(EngineError::ConfigParseError {
                path: "broken_mapping.json".to_string(),
                message: "expected value".to_string(),
            })
        });
        assert!(registry.get(Some("broken")).is_default());
        assert!(!registry.is_cached("broken"));
    }

    #[test]
    fn test_register_invalidates_cached_instance() {
        let registry = DesignRegistry::new();
        let first_count = register_counting(&registry, "template_sample1");
        registry.get(Some("template_sample1"));
        assert!(registry.is_cached("template_sample1"));

        let second_count = register_counting(&registry, "template_sample1");
        assert!(!registry.is_cached("template_sample1"));
        registry.get(Some("template_sample1"));

        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_available_excludes_unavailable() {
        let registry = DesignRegistry::new();
        register_counting(&registry, "template_sample2");
        register_counting(&registry, "template_sample1");
        registry.register_unavailable("template_sample3", "spreadsheet support not built");

        assert_eq!(
            registry.list_available(),
            vec!["template_sample1".to_string(), "template_sample2".to_string()]
        );
        assert!(registry.get(Some("template_sample3")).is_default());
    }
}
