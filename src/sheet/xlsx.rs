//! Serialization of a [`Sheet`] to `.xlsx` via `rust_xlsxwriter`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::{Align, CellStyle, CellValue, Sheet};

const PAPER_A4: u8 = 9;

/// Writes a sheet to an `.xlsx` file, overwriting any existing file.
///
/// # Errors
///
/// [`EngineError::Spreadsheet`] if the workbook is rejected by the writer,
/// [`EngineError::Io`] if the file cannot be written.
pub fn write_xlsx(sheet: &Sheet, path: &Path) -> EngineResult<()> {
    let bytes = to_xlsx_bytes(sheet)?;
    fs::write(path, bytes).map_err(|e| EngineError::io(path, e))?;
    debug!(path = %path.display(), "xlsx written");
    Ok(())
}

/// Serializes a sheet to `.xlsx` bytes.
pub fn to_xlsx_bytes(sheet: &Sheet) -> EngineResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_worksheet(worksheet, sheet).map_err(spreadsheet_error)?;
    workbook.save_to_buffer().map_err(spreadsheet_error)
}

fn spreadsheet_error(e: XlsxError) -> EngineError {
    EngineError::Spreadsheet {
        message: e.to_string(),
    }
}

fn fill_worksheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;

    let formats: HashMap<&str, Format> = sheet
        .styles()
        .iter()
        .map(|(name, style)| (name.as_str(), to_format(style)))
        .collect();
    let plain = Format::new();

    for (col, width) in sheet.column_widths() {
        worksheet.set_column_width(*col, *width)?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet.set_row_height(*row, *height)?;
    }

    for range in sheet.merged_ranges() {
        let anchor = sheet.cell(range.first);
        let format = pick_format(&formats, &plain, anchor.and_then(|cell| cell.style.as_ref()));
        worksheet.merge_range(
            range.first.row,
            range.first.col,
            range.last.row,
            range.last.col,
            "",
            format,
        )?;
    }

    for (address, cell) in sheet.cells() {
        let in_merge = sheet.merged_range_at(*address);
        if in_merge.is_some_and(|range| range.first != *address) {
            continue;
        }
        let format = pick_format(&formats, &plain, cell.style.as_ref());
        match &cell.value {
            Some(CellValue::Text(text)) => {
                worksheet.write_string_with_format(address.row, address.col, text, format)?;
            }
            Some(CellValue::Integer(value)) => {
                worksheet.write_number_with_format(address.row, address.col, *value as f64, format)?;
            }
            Some(CellValue::Formula(formula)) => {
                worksheet.write_formula_with_format(
                    address.row,
                    address.col,
                    formula.as_str(),
                    format,
                )?;
            }
            None if in_merge.is_none() => {
                worksheet.write_blank(address.row, address.col, format)?;
            }
            None => {}
        }
    }

    apply_page_setup(worksheet, sheet)
}

fn pick_format<'a>(
    formats: &'a HashMap<&str, Format>,
    plain: &'a Format,
    style: Option<&String>,
) -> &'a Format {
    style
        .and_then(|name| formats.get(name.as_str()))
        .unwrap_or(plain)
}

fn apply_page_setup(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), XlsxError> {
    let page = &sheet.page;
    if page.portrait {
        worksheet.set_portrait();
    } else {
        worksheet.set_landscape();
    }
    if page.a4 {
        worksheet.set_paper_size(PAPER_A4);
    }
    let m = page.margins;
    worksheet.set_margins(m.left, m.right, m.top, m.bottom, m.header, m.footer);
    if let Some(area) = page.print_area {
        worksheet.set_print_area(area.first.row, area.first.col, area.last.row, area.last.col)?;
    }
    if let Some((width, height)) = page.fit_to_pages {
        worksheet.set_print_fit_to_pages(width, height);
    }
    Ok(())
}

fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(color);
    }
    if let Some(color) = style.background {
        format = format.set_background_color(color);
    }
    if style.border {
        format = format.set_border(FormatBorder::Thin);
    }
    if let Some(align) = style.align {
        format = format.set_align(match align {
            Align::Left => FormatAlign::Left,
            Align::Center => FormatAlign::Center,
            Align::Right => FormatAlign::Right,
        });
    }
    if let Some(number_format) = &style.number_format {
        format = format.set_num_format(number_format);
    }
    format.set_align(FormatAlign::VerticalCenter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{CellAddress, CellRange, PageSetup};

    fn create_test_sheet() -> Sheet {
        let mut sheet = Sheet::new("급여명세서");
        sheet.add_style(
            "header",
            CellStyle {
                bold: true,
                background: Some(0xE3F2FD),
                border: true,
                align: Some(Align::Center),
                ..CellStyle::default()
            },
        );
        let title: CellRange = "A1:B1".parse().unwrap();
        sheet.merge(title).unwrap();
        sheet.set_style(title.first, "header").unwrap();
        sheet.set_value(title.first, "급여명세서");
        sheet.set_value(CellAddress::new(1, 1), 3_000_000);
        sheet.set_value(CellAddress::new(2, 1), CellValue::Formula("=B2*2".to_string()));
        sheet.set_column_width(0, 20.0);
        sheet.page = PageSetup::single_page("A1:B3".parse().unwrap());
        sheet
    }

    #[test]
    fn test_to_xlsx_bytes_produces_zip_container() {
        let bytes = to_xlsx_bytes(&create_test_sheet()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_xlsx_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_xlsx(&create_test_sheet(), &path).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_write_xlsx_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        let err = write_xlsx(&create_test_sheet(), &path).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[test]
    fn test_invalid_sheet_name_is_spreadsheet_error() {
        let mut sheet = create_test_sheet();
        sheet.name = "bad/name".to_string();
        assert!(matches!(
            to_xlsx_bytes(&sheet),
            Err(EngineError::Spreadsheet { .. })
        ));
    }
}
