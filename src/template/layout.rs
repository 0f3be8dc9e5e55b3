//! Declarative template layouts.
//!
//! A template asset is a YAML description of the blank payslip form. The
//! renderer builds a [`Sheet`] from it and then fills the mapped cells.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::sheet::{CellAddress, CellRange, CellStyle, CellValue, Sheet};

/// One static cell of a template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaticCell {
    /// Where the cell is.
    pub at: CellAddress,
    /// Text content.
    #[serde(default)]
    pub text: Option<String>,
    /// Numeric content.
    #[serde(default)]
    pub number: Option<i64>,
    /// Formula content, e.g. `=H23-H24`.
    #[serde(default)]
    pub formula: Option<String>,
    /// Style name.
    #[serde(default)]
    pub style: Option<String>,
}

impl StaticCell {
    fn value(&self) -> Option<CellValue> {
        if let Some(formula) = &self.formula {
            return Some(CellValue::Formula(formula.clone()));
        }
        if let Some(number) = self.number {
            return Some(CellValue::Integer(number));
        }
        self.text.clone().map(CellValue::Text)
    }
}

/// A style applied to every cell of a range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StyledRange {
    /// The range.
    pub range: CellRange,
    /// Style name.
    pub style: String,
}

fn default_print_area() -> CellRange {
    CellRange::new(CellAddress::new(0, 1), CellAddress::new(27, 7))
}

/// The blank form of one design.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateLayout {
    /// Worksheet name.
    pub sheet_name: String,
    /// Column widths keyed by column letter.
    #[serde(default)]
    pub columns: BTreeMap<String, f64>,
    /// Row heights keyed by 1-based row number.
    #[serde(default)]
    pub rows: BTreeMap<u32, f64>,
    /// Named styles.
    #[serde(default)]
    pub styles: BTreeMap<String, CellStyle>,
    /// Merged ranges.
    #[serde(default)]
    pub merges: Vec<CellRange>,
    /// Ranges styled before static cells are written.
    #[serde(default)]
    pub styled_ranges: Vec<StyledRange>,
    /// Static labels, numbers and formulas.
    #[serde(default)]
    pub cells: Vec<StaticCell>,
    /// Printed area; `B1:H28` when omitted.
    #[serde(default = "default_print_area")]
    pub print_area: CellRange,
}

impl TemplateLayout {
    /// Loads a layout from a YAML file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be read,
    /// [`EngineError::ConfigParseError`] if the YAML is invalid.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Builds the blank sheet.
    ///
    /// # Errors
    ///
    /// Fails on overlapping merges, unknown style names, or bad column letters.
    pub fn to_sheet(&self) -> EngineResult<Sheet> {
        let mut sheet = Sheet::new(self.sheet_name.clone());
        for (name, style) in &self.styles {
            sheet.add_style(name.clone(), style.clone());
        }
        for (letters, width) in &self.columns {
            let column: CellAddress = format!("{letters}1").parse()?;
            sheet.set_column_width(column.col, *width);
        }
        for (row, height) in &self.rows {
            if *row == 0 {
                return Err(EngineError::InvalidCellAddress {
                    address: format!("row {row}"),
                });
            }
            sheet.set_row_height(row - 1, *height);
        }
        for range in &self.merges {
            sheet.merge(*range)?;
        }
        for styled in &self.styled_ranges {
            sheet.style_range(styled.range, &styled.style)?;
        }
        for cell in &self.cells {
            if let Some(style) = &cell.style {
                sheet.set_style(cell.at, style.clone())?;
            }
            if let Some(value) = cell.value() {
                sheet.set_value(cell.at, value);
            }
        }
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r##"
sheet_name: 급여명세서
columns: { A: 2, B: 14, H: 16 }
rows: { 1: 32 }
styles:
  title: { bold: true, font_size: 18, align: center }
  box: { border: true, background: "#F2F2F2" }
merges: ["B1:H1", "B7:C7"]
styled_ranges:
  - { range: "B7:C8", style: box }
cells:
  - { at: B1, text: "급 여 명 세 서", style: title }
  - { at: H23, number: 0 }
  - { at: H25, formula: "=H23-H24" }
"##;

    fn create_test_layout() -> TemplateLayout {
        serde_yaml::from_str(LAYOUT).unwrap()
    }

    #[test]
    fn test_layout_parses_with_default_print_area() {
        let layout = create_test_layout();
        assert_eq!(layout.print_area.to_string(), "B1:H28");
        assert_eq!(layout.merges.len(), 2);
        assert_eq!(layout.styles["box"].background, Some(0xF2F2F2));
    }

    #[test]
    fn test_to_sheet_applies_layout() {
        let sheet = create_test_layout().to_sheet().unwrap();
        let b1: CellAddress = "B1".parse().unwrap();

        assert_eq!(sheet.name, "급여명세서");
        assert_eq!(sheet.column_widths().get(&1), Some(&14.0));
        assert_eq!(sheet.row_heights().get(&0), Some(&32.0));
        assert_eq!(sheet.value(b1).and_then(CellValue::as_text), Some("급 여 명 세 서"));
        assert_eq!(sheet.cell(b1).and_then(|c| c.style.as_deref()), Some("title"));
        assert_eq!(
            sheet.value("H25".parse().unwrap()),
            Some(&CellValue::Formula("=H23-H24".to_string()))
        );
        assert_eq!(
            sheet.anchor_for("C7".parse().unwrap()),
            "B7".parse::<CellAddress>().unwrap()
        );
        assert_eq!(
            sheet.cell("C8".parse().unwrap()).and_then(|c| c.style.as_deref()),
            Some("box")
        );
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        let mut layout = create_test_layout();
        layout.cells[0].style = Some("missing".to_string());
        assert!(matches!(layout.to_sheet(), Err(EngineError::Spreadsheet { .. })));
    }

    #[test]
    fn test_overlapping_merges_are_rejected() {
        let mut layout = create_test_layout();
        layout.merges.push("C7:D7".parse().unwrap());
        assert!(layout.to_sheet().is_err());
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "sheet_name: [unclosed").unwrap();
        match TemplateLayout::load(&path) {
            Err(EngineError::ConfigParseError { path: reported, .. }) => {
                assert!(reported.ends_with("broken.yaml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
