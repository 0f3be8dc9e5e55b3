//! Template-driven spreadsheet rendering.
//!
//! A template design combines a declarative layout ([`TemplateLayout`]),
//! a cell mapping ([`CellMapping`]) and the resolver that writes payslip
//! values through it ([`CellMappingResolver`]). The legacy two-column
//! layout lives here too and backs the "default" design.

mod design;
mod layout;
mod legacy;
mod mapping;
mod search;

pub use design::{BUILTIN_DESIGNS, TEMPLATE_SAMPLE1, TEMPLATE_SAMPLE2, TemplateDesign, register_builtin};
pub use layout::{StaticCell, StyledRange, TemplateLayout};
pub use legacy::{LegacyDesign, legacy_sheet};
pub use mapping::{
    CellMapping, CellMappingResolver, DEDUCTION_ITEMS, PAYMENT_ITEMS, TOTAL_KEYS, TemplateItem,
};
pub use search::{AssetSearch, DesignAssets};
