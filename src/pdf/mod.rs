//! Procedural PDF payslip renderer.
//!
//! Draws a single A4 page directly from primitives with no template asset:
//! a title block, an identity block with the masked national id, a payment
//! table, a deduction table, and a net-pay banner. This renderer is the
//! terminal fallback of the conversion chain and the PDF path of the
//! default design, so it depends on nothing outside the process.

mod font;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::{debug, info};

use crate::config::FontSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{LineItem, PayslipData, format_won};

pub use font::{EmbeddedFont, FONT_RESOURCE, PdfFont};

const MM: f32 = 72.0 / 25.4;
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 30.0 * MM;

const ROW_HEIGHT: f32 = 10.0 * MM;
const HEADER_HEIGHT: f32 = 8.0 * MM;
const TOTAL_HEIGHT: f32 = 12.0 * MM;

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0.0, 0.0, 0.0);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const GRAY_TEXT: Rgb = (0.4, 0.4, 0.4);
const ROW_SHADE: Rgb = (0.98, 0.98, 0.98);
const ROW_RULE: Rgb = (0.9, 0.9, 0.9);
const PAYMENT_ACCENT: Rgb = (0.2, 0.4, 0.8);
const PAYMENT_TOTAL_FILL: Rgb = (0.9, 0.95, 1.0);
const DEDUCTION_ACCENT: Rgb = (0.8, 0.2, 0.2);
const DEDUCTION_TOTAL_FILL: Rgb = (1.0, 0.95, 0.95);
const NET_STROKE: Rgb = (0.0, 0.4, 0.8);
const NET_TEXT: Rgb = (0.0, 0.0, 0.8);

/// Draws payslips as PDF without any template.
///
/// The font is resolved from the candidate list on first use and reused for
/// every later document.
#[derive(Debug)]
pub struct ProceduralPdfRenderer {
    candidates: Vec<PathBuf>,
    font: OnceLock<PdfFont>,
}

impl ProceduralPdfRenderer {
    /// Creates a renderer that resolves its font from `settings`.
    pub fn new(settings: &FontSettings) -> Self {
        Self {
            candidates: settings.cjk_candidates.clone(),
            font: OnceLock::new(),
        }
    }

    /// Creates a renderer with an already-resolved font.
    pub fn with_font(font: PdfFont) -> Self {
        Self {
            candidates: Vec::new(),
            font: OnceLock::from(font),
        }
    }

    /// Returns the font documents are drawn with.
    pub fn font(&self) -> &PdfFont {
        self.font.get_or_init(|| PdfFont::resolve(&self.candidates))
    }

    /// Draws a payslip and writes it to `path`, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be written, or
    /// [`EngineError::PdfRender`] if no document was produced.
    pub fn draw(&self, data: PayslipData<'_>, path: &Path) -> EngineResult<()> {
        let bytes = self.render(data);
        if bytes.is_empty() {
            return Err(EngineError::PdfRender {
                message: format!("empty document for '{}'", data.input.name),
            });
        }
        fs::write(path, &bytes).map_err(|e| EngineError::io(path, e))?;
        info!(path = %path.display(), bytes = bytes.len(), "procedural PDF written");
        Ok(())
    }

    /// Renders a payslip to PDF bytes.
    pub fn render(&self, data: PayslipData<'_>) -> Vec<u8> {
        let font = self.font();
        let canvas = paint(data, font);

        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let page_id = alloc();
        let content_id = alloc();
        let info_id = alloc();

        let font_id = font.write_objects(
            &mut pdf,
            &mut alloc,
            canvas.strings.iter().map(String::as_str),
        );

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id).kids([page_id]).count(1);
        {
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
                .parent(pages_id)
                .contents(content_id);
            page.resources().fonts().pair(Name(FONT_RESOURCE), font_id);
        }
        pdf.stream(content_id, &deflate(&canvas.content.finish()))
            .filter(Filter::FlateDecode);
        pdf.document_info(info_id)
            .title(TextStr("급여명세서"))
            .producer(TextStr("payslip-engine"));

        debug!(cjk = font.is_cjk(), "procedural PDF rendered");
        pdf.finish()
    }
}

/// Zlib-compresses a stream body for `FlateDecode`.
pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}

struct Canvas<'f> {
    content: Content,
    font: &'f PdfFont,
    strings: Vec<String>,
}

impl<'f> Canvas<'f> {
    fn new(font: &'f PdfFont) -> Self {
        Self {
            content: Content::new(),
            font,
            strings: Vec::new(),
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.content
            .set_fill_rgb(color.0, color.1, color.2)
            .rect(x, y, w, h)
            .fill_nonzero();
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb, width: f32) {
        self.content
            .set_stroke_rgb(color.0, color.1, color.2)
            .set_line_width(width)
            .rect(x, y, w, h)
            .stroke();
    }

    fn hline(&mut self, x: f32, y: f32, w: f32, color: Rgb) {
        self.content
            .set_stroke_rgb(color.0, color.1, color.2)
            .set_line_width(0.5)
            .move_to(x, y)
            .line_to(x + w, y)
            .stroke();
    }

    fn text(&mut self, x: f32, y: f32, size: f32, color: Rgb, text: &str) {
        let encoded = self.font.encode(text);
        self.content
            .set_fill_rgb(color.0, color.1, color.2)
            .begin_text()
            .set_font(Name(FONT_RESOURCE), size)
            .next_line(x, y)
            .show(Str(&encoded))
            .end_text();
        self.strings.push(text.to_string());
    }

    fn text_right(&mut self, right: f32, y: f32, size: f32, color: Rgb, text: &str) {
        let width = self.font.text_width(text, size);
        self.text(right - width, y, size, color, text);
    }
}

fn paint<'f>(data: PayslipData<'_>, font: &'f PdfFont) -> Canvas<'f> {
    let mut canvas = Canvas::new(font);
    let width = PAGE_WIDTH - 2.0 * MARGIN;
    let x = MARGIN;
    let mut y = PAGE_HEIGHT - MARGIN;

    // Title block
    let title_height = 25.0 * MM;
    canvas.fill_rect(x, y - title_height, width, title_height, (0.95, 0.95, 0.95));
    canvas.stroke_rect(x, y - title_height, width, title_height, (0.7, 0.7, 0.7), 1.0);
    canvas.text(x + 10.0 * MM, y - 12.0 * MM, 22.0, BLACK, "급여명세서");
    canvas.text(
        x + 10.0 * MM,
        y - 20.0 * MM,
        11.0,
        GRAY_TEXT,
        &format!("지급기간: {}", data.period.formatted()),
    );
    y -= title_height + 10.0 * MM;

    // Identity block
    let info_height = 40.0 * MM;
    canvas.fill_rect(x, y - info_height, width, info_height, ROW_SHADE);
    canvas.stroke_rect(x, y - info_height, width, info_height, (0.8, 0.8, 0.8), 1.0);
    let mut info_y = y - 10.0 * MM;
    let mut identity = vec![
        format!("성명: {}", data.input.name),
        format!("주민번호: {}", data.input.masked_national_id()),
    ];
    let hire_date = data.input.hire_date_label();
    if !hire_date.is_empty() {
        identity.push(format!("입사일: {hire_date}"));
    }
    for line in &identity {
        canvas.text(x + 10.0 * MM, info_y, 11.0, BLACK, line);
        info_y -= 10.0 * MM;
    }
    let department = data.input.department_position();
    if !department.is_empty() {
        canvas.text_right(x + width - 10.0 * MM, y - 10.0 * MM, 11.0, BLACK, &department);
    }
    y -= info_height + 12.0 * MM;

    let breakdown = data.breakdown;
    y = table(
        &mut canvas,
        TableSpec {
            x,
            y,
            width,
            title: "지급 항목",
            accent: PAYMENT_ACCENT,
            total_fill: PAYMENT_TOTAL_FILL,
            total_label: "총 지급액",
            total: breakdown.gross_pay,
        },
        &breakdown.visible_payment_items(),
    );
    y -= 5.0 * MM;
    y = table(
        &mut canvas,
        TableSpec {
            x,
            y,
            width,
            title: "공제 항목",
            accent: DEDUCTION_ACCENT,
            total_fill: DEDUCTION_TOTAL_FILL,
            total_label: "총 공제액",
            total: breakdown.total_deduction,
        },
        &breakdown.deduction_items(),
    );
    y -= 10.0 * MM;

    // Net pay banner
    let banner_height = 20.0 * MM;
    canvas.fill_rect(x, y - banner_height, width, banner_height, PAYMENT_TOTAL_FILL);
    canvas.stroke_rect(x, y - banner_height, width, banner_height, NET_STROKE, 2.0);
    canvas.text(
        x + 10.0 * MM,
        y - 13.0 * MM,
        18.0,
        NET_TEXT,
        &format!("실수령액: {}", format_won(breakdown.net_pay)),
    );

    canvas
}

struct TableSpec<'a> {
    x: f32,
    y: f32,
    width: f32,
    title: &'a str,
    accent: Rgb,
    total_fill: Rgb,
    total_label: &'a str,
    total: i64,
}

/// Draws one bordered two-column table and returns the y below it.
fn table(canvas: &mut Canvas<'_>, spec: TableSpec<'_>, rows: &[LineItem]) -> f32 {
    let TableSpec { x, width, .. } = spec;
    let amount_col = x + width * 0.6;
    let right = x + width - 5.0 * MM;
    let mut y = spec.y;

    canvas.fill_rect(x, y - HEADER_HEIGHT, width, HEADER_HEIGHT, spec.accent);
    canvas.text(x + 5.0 * MM, y - 6.0 * MM, 12.0, WHITE, spec.title);
    canvas.text(amount_col + 5.0 * MM, y - 6.0 * MM, 12.0, WHITE, "금액");
    y -= HEADER_HEIGHT + 2.0 * MM;

    for (index, row) in rows.iter().enumerate() {
        let shade = if index % 2 == 0 { ROW_SHADE } else { WHITE };
        canvas.fill_rect(x, y - ROW_HEIGHT, width, ROW_HEIGHT, shade);
        canvas.hline(x, y - ROW_HEIGHT, width, ROW_RULE);
        canvas.text(x + 5.0 * MM, y - 7.0 * MM, 10.0, BLACK, row.label);
        canvas.text_right(right, y - 7.0 * MM, 10.0, BLACK, &format_won(row.amount));
        y -= ROW_HEIGHT;
    }

    canvas.fill_rect(x, y - TOTAL_HEIGHT, width, TOTAL_HEIGHT, spec.total_fill);
    canvas.stroke_rect(x, y - TOTAL_HEIGHT, width, TOTAL_HEIGHT, spec.accent, 1.5);
    canvas.text(x + 5.0 * MM, y - 8.0 * MM, 11.0, BLACK, spec.total_label);
    canvas.text_right(right, y - 8.0 * MM, 11.0, BLACK, &format_won(spec.total));
    y - TOTAL_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::calculate;
    use crate::config::StatutoryTables;
    use crate::models::{CompensationInput, PayPeriod, PayrollBreakdown};
    use chrono::NaiveDate;

    fn create_test_input() -> CompensationInput {
        CompensationInput {
            national_id: "900101-1234567".to_string(),
            hire_date: NaiveDate::from_ymd_opt(2020, 3, 2),
            department: "개발팀".to_string(),
            ..CompensationInput::new("홍길동", 3_000_000)
        }
    }

    fn render_strings(input: &CompensationInput, breakdown: &PayrollBreakdown) -> Vec<String> {
        let period = PayPeriod::new("2025-01");
        let data = PayslipData {
            input,
            breakdown,
            period: &period,
        };
        paint(data, &PdfFont::Builtin).strings
    }

    #[test]
    fn test_render_produces_pdf_with_builtin_font() {
        let renderer = ProceduralPdfRenderer::with_font(PdfFont::Builtin);
        let input = create_test_input();
        let breakdown = calculate(&input, &StatutoryTables::default());
        let period = PayPeriod::new("2025-01");
        let bytes = renderer.render(PayslipData {
            input: &input,
            breakdown: &breakdown,
            period: &period,
        });

        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Helvetica"));
        assert!(text.contains("%%EOF"));
    }

    #[test]
    fn test_national_id_is_masked() {
        let input = create_test_input();
        let strings = render_strings(&input, &PayrollBreakdown::default());
        assert!(strings.iter().any(|s| s == "주민번호: 900101-*******"));
        assert!(!strings.iter().any(|s| s.contains("1234567")));
    }

    #[test]
    fn test_zero_payment_rows_are_omitted_but_deductions_kept() {
        let input = create_test_input();
        let breakdown = PayrollBreakdown {
            base_salary: 0,
            ..PayrollBreakdown::default()
        };
        let strings = render_strings(&input, &breakdown);
        assert!(strings.iter().any(|s| s == "기본급"));
        assert!(!strings.iter().any(|s| s == "연장근무수당"));
        assert!(!strings.iter().any(|s| s == "상여금"));
        for label in ["국민연금", "건강보험", "장기요양보험", "고용보험", "소득세", "지방소득세"] {
            assert!(strings.iter().any(|s| s == label), "missing {label}");
        }
    }

    #[test]
    fn test_net_pay_banner_and_period() {
        let input = create_test_input();
        let breakdown = calculate(&input, &StatutoryTables::default());
        let strings = render_strings(&input, &breakdown);
        assert!(strings.contains(&format!("실수령액: {}", format_won(breakdown.net_pay))));
        assert!(strings.contains(&"지급기간: 2025년 01월".to_string()));
        assert!(strings.contains(&"개발팀".to_string()));
    }

    #[test]
    fn test_draw_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payslip.pdf");
        let renderer = ProceduralPdfRenderer::with_font(PdfFont::Builtin);
        let input = create_test_input();
        let breakdown = PayrollBreakdown::default();
        let period = PayPeriod::new("2025-01");
        renderer
            .draw(
                PayslipData {
                    input: &input,
                    breakdown: &breakdown,
                    period: &period,
                },
                &path,
            )
            .unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_renderer_without_fonts_degrades_to_builtin() {
        let renderer = ProceduralPdfRenderer::new(&FontSettings {
            cjk_candidates: vec![PathBuf::from("/nonexistent/font.ttf")],
        });
        assert!(!renderer.font().is_cjk());
    }
}
