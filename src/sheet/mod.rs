//! In-memory worksheet model.
//!
//! Templates and the legacy layout both build a [`Sheet`]: cell values,
//! named styles, merged ranges, column widths, row heights and page setup.
//! The model is plain data so two renders of the same input can be compared
//! directly, and [`write_xlsx`] serializes it to an `.xlsx` file.

mod address;
mod xlsx;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::{EngineError, EngineResult};

pub use address::{CellAddress, CellRange, MAX_COL, MAX_ROW};
pub use xlsx::{to_xlsx_bytes, write_xlsx};

/// The value held by one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Text.
    Text(String),
    /// A whole-won amount or other integer.
    Integer(i64),
    /// A formula such as `=H23-H24`.
    Formula(String),
}

impl CellValue {
    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer if this is a numeric value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Left aligned.
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
}

/// A named cell style.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    /// Bold font.
    pub bold: bool,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Font color as `0xRRGGBB`.
    #[serde(deserialize_with = "deserialize_color")]
    pub font_color: Option<u32>,
    /// Fill color as `0xRRGGBB`.
    #[serde(deserialize_with = "deserialize_color")]
    pub background: Option<u32>,
    /// Thin border on all four sides.
    pub border: bool,
    /// Horizontal alignment.
    pub align: Option<Align>,
    /// Number format such as `#,##0`.
    pub number_format: Option<String>,
}

fn deserialize_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|value| {
        u32::from_str_radix(value.trim().trim_start_matches('#'), 16)
            .map_err(|_| serde::de::Error::custom(format!("invalid color '{value}'")))
    })
    .transpose()
}

/// One cell: a value and an optional style name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// The value, or `None` for a styled blank.
    pub value: Option<CellValue>,
    /// Name of a style registered on the sheet.
    pub style: Option<String>,
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    /// Left margin.
    pub left: f64,
    /// Right margin.
    pub right: f64,
    /// Top margin.
    pub top: f64,
    /// Bottom margin.
    pub bottom: f64,
    /// Header margin.
    pub header: f64,
    /// Footer margin.
    pub footer: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

impl Margins {
    /// The same margin on every side with no header or footer space.
    pub fn uniform(inches: f64) -> Self {
        Self {
            left: inches,
            right: inches,
            top: inches,
            bottom: inches,
            header: 0.0,
            footer: 0.0,
        }
    }
}

/// Print settings for a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    /// Portrait orientation.
    pub portrait: bool,
    /// A4 paper.
    pub a4: bool,
    /// Margins.
    pub margins: Margins,
    /// Print area.
    pub print_area: Option<CellRange>,
    /// Fit to `(width, height)` pages.
    pub fit_to_pages: Option<(u16, u16)>,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            portrait: true,
            a4: true,
            margins: Margins::default(),
            print_area: None,
            fit_to_pages: None,
        }
    }
}

impl PageSetup {
    /// Single page, fit 1x1, A4 portrait, 0.2 inch margins.
    pub fn single_page(print_area: CellRange) -> Self {
        Self {
            portrait: true,
            a4: true,
            margins: Margins::uniform(0.2),
            print_area: Some(print_area),
            fit_to_pages: Some((1, 1)),
        }
    }
}

/// An in-memory worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Worksheet name.
    pub name: String,
    cells: BTreeMap<CellAddress, Cell>,
    merged: Vec<CellRange>,
    styles: BTreeMap<String, CellStyle>,
    column_widths: BTreeMap<u16, f64>,
    row_heights: BTreeMap<u32, f64>,
    /// Print settings.
    pub page: PageSetup,
}

impl Sheet {
    /// Creates an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            merged: Vec::new(),
            styles: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            page: PageSetup::default(),
        }
    }

    /// Registers a named style, replacing any style with the same name.
    pub fn add_style(&mut self, name: impl Into<String>, style: CellStyle) {
        self.styles.insert(name.into(), style);
    }

    /// Returns a named style.
    pub fn style(&self, name: &str) -> Option<&CellStyle> {
        self.styles.get(name)
    }

    /// Sets a cell value directly, keeping the cell's style.
    ///
    /// This does not redirect into merged ranges; use
    /// [`CellMappingResolver`](crate::template::CellMappingResolver) for
    /// writes that must land on an anchor.
    pub fn set_value(&mut self, address: CellAddress, value: impl Into<CellValue>) {
        self.cells.entry(address).or_default().value = Some(value.into());
    }

    /// Applies a named style to a cell.
    pub fn set_style(&mut self, address: CellAddress, style: impl Into<String>) -> EngineResult<()> {
        let style = style.into();
        if !self.styles.contains_key(&style) {
            return Err(EngineError::Spreadsheet {
                message: format!("unknown style '{style}' at {address}"),
            });
        }
        self.cells.entry(address).or_default().style = Some(style);
        Ok(())
    }

    /// Applies a named style to every cell in a range.
    pub fn style_range(&mut self, range: CellRange, style: &str) -> EngineResult<()> {
        for row in range.first.row..=range.last.row {
            for col in range.first.col..=range.last.col {
                self.set_style(CellAddress::new(row, col), style)?;
            }
        }
        Ok(())
    }

    /// Returns a cell.
    pub fn cell(&self, address: CellAddress) -> Option<&Cell> {
        self.cells.get(&address)
    }

    /// Returns a cell's value.
    pub fn value(&self, address: CellAddress) -> Option<&CellValue> {
        self.cells.get(&address).and_then(|cell| cell.value.as_ref())
    }

    /// Iterates over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &Cell)> {
        self.cells.iter()
    }

    /// Merges a range. Overlapping an existing merged range is an error.
    pub fn merge(&mut self, range: CellRange) -> EngineResult<()> {
        if range.is_single_cell() {
            return Ok(());
        }
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(&range)) {
            return Err(EngineError::Spreadsheet {
                message: format!("merged range {range} overlaps {existing}"),
            });
        }
        self.merged.push(range);
        Ok(())
    }

    /// Returns the merged ranges in insertion order.
    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged
    }

    /// Returns the merged range containing `address`, if any.
    pub fn merged_range_at(&self, address: CellAddress) -> Option<CellRange> {
        self.merged.iter().copied().find(|range| range.contains(address))
    }

    /// Returns the cell that actually receives a write to `address`.
    ///
    /// Inside a merged range this is the range's top-left anchor; anywhere
    /// else it is `address` itself.
    pub fn anchor_for(&self, address: CellAddress) -> CellAddress {
        self.merged_range_at(address)
            .map(|range| range.first)
            .unwrap_or(address)
    }

    /// Sets a column width in character units.
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Sets a row height in points.
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    /// Returns the column widths.
    pub fn column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    /// Returns the row heights.
    pub fn row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    pub(crate) fn styles(&self) -> &BTreeMap<String, CellStyle> {
        &self.styles
    }
}
