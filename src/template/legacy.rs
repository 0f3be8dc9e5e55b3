//! The legacy fixed layout used when no design applies.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::convert::{ConversionOutcome, StrategyKind};
use crate::design::{DEFAULT_DESIGN, PayslipDesign};
use crate::error::EngineResult;
use crate::models::{PayslipData, format_won};
use crate::pdf::ProceduralPdfRenderer;
use crate::sheet::{Align, CellAddress, CellRange, CellStyle, Sheet, write_xlsx};

const COLUMN_WIDTH: f64 = 20.0;
const AMOUNT_FORMAT: &str = "#,##0";

/// Builds the two-column legacy payslip sheet.
///
/// Base salary is always listed; overtime and bonus only when positive.
/// All six deductions are listed.
pub fn legacy_sheet(data: PayslipData<'_>) -> EngineResult<Sheet> {
    let mut sheet = Sheet::new("급여명세서");
    add_styles(&mut sheet);
    sheet.set_column_width(0, COLUMN_WIDTH);
    sheet.set_column_width(1, COLUMN_WIDTH);

    let input = data.input;
    let breakdown = data.breakdown;
    let mut row = 0;

    banner(&mut sheet, row, "급여명세서", "title")?;
    row += 1;
    if !data.period.is_empty() {
        banner(&mut sheet, row, &data.period.header(), "label")?;
        row += 1;
    }
    row += 1;

    let mut identity = vec![
        ("성명", input.name.clone()),
        ("주민번호", input.masked_national_id()),
    ];
    if input.hire_date.is_some() {
        identity.push(("입사일", input.hire_date_label()));
    }
    for (label, value) in identity {
        pair(&mut sheet, row, label, value, "label")?;
        row += 1;
    }
    row += 1;

    banner(&mut sheet, row, "지급 항목", "header")?;
    row += 1;
    for item in breakdown.visible_payment_items() {
        amount_row(&mut sheet, row, item.label, item.amount, "item", "amount")?;
        row += 1;
    }
    amount_row(&mut sheet, row, "총 지급액", breakdown.gross_pay, "total", "total_amount")?;
    row += 2;

    banner(&mut sheet, row, "공제 항목", "header")?;
    row += 1;
    for item in breakdown.deduction_items() {
        amount_row(&mut sheet, row, item.label, item.amount, "item", "amount")?;
        row += 1;
    }
    amount_row(
        &mut sheet,
        row,
        "총 공제액",
        breakdown.total_deduction,
        "total",
        "total_amount",
    )?;
    row += 2;

    banner(
        &mut sheet,
        row,
        &format!("실수령액: {}", format_won(breakdown.net_pay)),
        "net",
    )?;
    Ok(sheet)
}

fn add_styles(sheet: &mut Sheet) {
    let header_fill = Some(0xE3F2FD);
    let total_fill = Some(0xBBDEFB);
    sheet.add_style(
        "title",
        CellStyle {
            bold: true,
            font_size: Some(16.0),
            align: Some(Align::Center),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "label",
        CellStyle {
            font_size: Some(10.0),
            align: Some(Align::Left),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "header",
        CellStyle {
            bold: true,
            font_size: Some(11.0),
            background: header_fill,
            border: true,
            align: Some(Align::Center),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "item",
        CellStyle {
            font_size: Some(10.0),
            border: true,
            align: Some(Align::Left),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "amount",
        CellStyle {
            font_size: Some(10.0),
            border: true,
            align: Some(Align::Right),
            number_format: Some(AMOUNT_FORMAT.to_string()),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "total",
        CellStyle {
            bold: true,
            font_size: Some(11.0),
            background: total_fill,
            border: true,
            align: Some(Align::Left),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "total_amount",
        CellStyle {
            bold: true,
            font_size: Some(11.0),
            background: total_fill,
            border: true,
            align: Some(Align::Right),
            number_format: Some(AMOUNT_FORMAT.to_string()),
            ..CellStyle::default()
        },
    );
    sheet.add_style(
        "net",
        CellStyle {
            bold: true,
            font_size: Some(12.0),
            font_color: Some(0x0000FF),
            border: true,
            align: Some(Align::Center),
            ..CellStyle::default()
        },
    );
}

/// Writes `text` across A:B.
fn banner(sheet: &mut Sheet, row: u32, text: &str, style: &str) -> EngineResult<()> {
    let range = CellRange::new(CellAddress::new(row, 0), CellAddress::new(row, 1));
    sheet.merge(range)?;
    sheet.style_range(range, style)?;
    sheet.set_value(range.first, text);
    Ok(())
}

fn pair(sheet: &mut Sheet, row: u32, label: &str, value: String, style: &str) -> EngineResult<()> {
    let label_cell = CellAddress::new(row, 0);
    let value_cell = CellAddress::new(row, 1);
    sheet.set_style(label_cell, style)?;
    sheet.set_style(value_cell, style)?;
    sheet.set_value(label_cell, label);
    sheet.set_value(value_cell, value);
    Ok(())
}

fn amount_row(
    sheet: &mut Sheet,
    row: u32,
    label: &str,
    amount: i64,
    label_style: &str,
    amount_style: &str,
) -> EngineResult<()> {
    let label_cell = CellAddress::new(row, 0);
    let amount_cell = CellAddress::new(row, 1);
    sheet.set_style(label_cell, label_style)?;
    sheet.set_style(amount_cell, amount_style)?;
    sheet.set_value(label_cell, label);
    sheet.set_value(amount_cell, amount);
    Ok(())
}

/// The "default" design: legacy spreadsheet and procedural PDF.
#[derive(Debug, Clone)]
pub struct LegacyDesign {
    renderer: Arc<ProceduralPdfRenderer>,
}

impl LegacyDesign {
    /// Creates the legacy design over a procedural renderer.
    pub fn new(renderer: Arc<ProceduralPdfRenderer>) -> Self {
        Self { renderer }
    }
}

impl PayslipDesign for LegacyDesign {
    fn id(&self) -> &str {
        DEFAULT_DESIGN
    }

    fn generate_excel(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<()> {
        let sheet = legacy_sheet(data)?;
        write_xlsx(&sheet, output)?;
        info!(path = %output.display(), "legacy spreadsheet written");
        Ok(())
    }

    fn generate_pdf(&self, data: PayslipData<'_>, output: &Path) -> EngineResult<ConversionOutcome> {
        self.renderer.draw(data, output)?;
        Ok(ConversionOutcome {
            strategy: StrategyKind::Procedural,
            intermediate: None,
        })
    }
}
