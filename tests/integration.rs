//! End-to-end tests for the payslip engine.
//!
//! This suite covers:
//! - The reference deduction scenario against the bundled configuration
//! - Dependent table clamping
//! - Template rendering to spreadsheet and PDF
//! - Legacy fallback when a template asset is missing
//! - Deprecated and default design identifiers
//! - Batch rendering, failure tallies and the archive
//! - Employees sharing a name and malformed input records

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_decimal::Decimal;

use payslip_engine::config::{ConfigLoader, RenderSettings};
use payslip_engine::convert::{Capabilities, FormatConverter, StrategyKind};
use payslip_engine::error::ErrorCategory;
use payslip_engine::models::{CompensationInput, OutputFormat, PayPeriod, RenderRequest};
use payslip_engine::pdf::{PdfFont, ProceduralPdfRenderer};
use payslip_engine::service::{PayslipService, parse_batch_entries};

// =============================================================================
// Test Helpers
// =============================================================================

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config").expect("Failed to load config")
}

/// A service over the bundled config with no external converters, so PDFs
/// are always drawn procedurally.
fn create_test_service(temp: &Path, designs_dir: Option<PathBuf>) -> PayslipService {
    let config = load_config();
    let mut render = RenderSettings {
        temp_dir: Some(temp.join("tmp")),
        sample_dir: temp.join("no-samples"),
        ..config.render().clone()
    };
    if let Some(dir) = designs_dir {
        render.designs_dir = dir;
    }
    let converter = FormatConverter::from_capabilities(
        &Capabilities::none(),
        &render,
        Arc::new(ProceduralPdfRenderer::with_font(PdfFont::Builtin)),
    );
    PayslipService::with_converter(
        ConfigLoader::from_parts(config.statutory().clone(), render),
        converter,
    )
}

fn create_reference_input() -> CompensationInput {
    CompensationInput {
        national_id: "850315-1234567".to_string(),
        overtime_hours: Decimal::from(10),
        overtime_rate: 10_000,
        dependents: 1,
        department: "개발팀".to_string(),
        position: "대리".to_string(),
        ..CompensationInput::new("김철수", 3_000_000)
    }
}

fn archive_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

// =============================================================================
// Calculation
// =============================================================================

#[test]
fn test_reference_scenario_with_bundled_config() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let breakdown = service.calculate(&create_reference_input()).unwrap();

    assert_eq!(breakdown.overtime_pay, 100_000);
    assert_eq!(breakdown.gross_pay, 3_100_000);
    assert_eq!(breakdown.national_pension, 135_000);
    assert_eq!(breakdown.health_insurance, 106_350);
    assert_eq!(breakdown.long_term_care, 13_772);
    assert_eq!(breakdown.employment_insurance, 27_000);
    assert_eq!(breakdown.dependent_deduction, 300_000);
    assert_eq!(breakdown.income_tax, 269_681);
    assert_eq!(breakdown.local_income_tax, 26_968);
    assert_eq!(breakdown.total_deduction, 578_771);
    assert_eq!(breakdown.net_pay, 2_521_229);
    assert!(breakdown.verify_invariants());
}

#[test]
fn test_dependents_above_table_clamp_to_last_entry() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let with = |dependents| {
        service
            .calculate(&CompensationInput {
                dependents,
                ..create_reference_input()
            })
            .unwrap()
    };

    assert_eq!(with(7).dependent_deduction, with(4).dependent_deduction);
    assert_eq!(with(7).income_tax, with(4).income_tax);
    assert!(with(0).income_tax >= with(1).income_tax);
}

#[test]
fn test_employee_json_defaults_missing_amounts() {
    let employees: Vec<CompensationInput> =
        serde_json::from_str(r#"[{"name": "이영희", "base_salary": 2500000}]"#).unwrap();
    assert_eq!(employees[0].bonus, 0);
    assert_eq!(employees[0].overtime_hours, Decimal::ZERO);
    assert!(employees[0].hire_date.is_none());
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_template_design_renders_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let input = create_reference_input();
    let breakdown = service.calculate(&input).unwrap();
    let request = RenderRequest {
        input,
        breakdown,
        period: PayPeriod::new("2025-01"),
        format: OutputFormat::Both,
        design: Some("template_sample2".to_string()),
        output_dir: dir.path().join("out"),
        file_stem: None,
    };

    let rendered = service.render(&request).unwrap();

    assert_eq!(rendered.design, "template_sample2");
    assert!(!rendered.used_legacy_fallback);
    let xlsx = fs::read(rendered.excel.as_ref().unwrap()).unwrap();
    assert!(xlsx.starts_with(b"PK"));
    let pdf = fs::read(rendered.pdf.as_ref().unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(rendered.pdf.as_ref().unwrap().ends_with("김철수_payslip.pdf"));

    let conversion = rendered.conversion.unwrap();
    assert_eq!(conversion.strategy, StrategyKind::Procedural);
    assert!(conversion.intermediate.is_some_and(|p| p.exists()));
}

#[test]
fn test_missing_template_still_yields_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), Some(dir.path().join("no-designs")));
    let input = create_reference_input();
    let breakdown = service.calculate(&input).unwrap();
    let request = RenderRequest {
        input,
        breakdown,
        period: PayPeriod::new("2025-01"),
        format: OutputFormat::Pdf,
        design: Some("template_sample1".to_string()),
        output_dir: dir.path().join("out"),
        file_stem: None,
    };

    let rendered = service.render(&request).unwrap();

    assert!(rendered.used_legacy_fallback);
    let pdf = fs::read(rendered.pdf.unwrap()).unwrap();
    assert!(pdf.len() > 100);
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_deprecated_design_matches_default() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let input = create_reference_input();
    let breakdown = service.calculate(&input).unwrap();
    let render = |design: Option<&str>, out: &str| {
        service
            .render(&RenderRequest {
                input: input.clone(),
                breakdown,
                period: PayPeriod::new("2025-01"),
                format: OutputFormat::Excel,
                design: design.map(str::to_string),
                output_dir: dir.path().join(out),
                file_stem: None,
            })
            .unwrap()
    };

    let deprecated = render(Some("design_2"), "deprecated");
    let default = render(Some("default"), "default");

    assert_eq!(deprecated.design, default.design);
    assert_eq!(deprecated.used_legacy_fallback, default.used_legacy_fallback);
    assert!(deprecated.excel.unwrap().exists());
}

// =============================================================================
// Batch
// =============================================================================

#[test]
fn test_batch_archives_every_document_and_tallies_failures() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let employees = vec![
        create_reference_input(),
        CompensationInput {
            bonus: -1,
            ..CompensationInput::new("박음수", 2_000_000)
        },
        CompensationInput::new("이영희", 2_500_000),
    ];
    let out = dir.path().join("batch");

    let report = service
        .render_batch(
            &employees,
            &PayPeriod::new("2025-01"),
            Some("template_sample1"),
            OutputFormat::Both,
            &out,
        )
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed_names(), vec!["박음수"]);
    assert_eq!(report.failed[0].category, ErrorCategory::Format);

    let archive = report.archive.unwrap();
    assert_eq!(archive, out.join("payslips_2025-01_both.zip"));
    assert_eq!(
        archive_entries(&archive),
        vec![
            "김철수_payslip.pdf".to_string(),
            "김철수_payslip.xlsx".to_string(),
            "이영희_payslip.pdf".to_string(),
            "이영희_payslip.xlsx".to_string(),
        ]
    );
    assert_eq!(report.totals.gross, 3_100_000 + 2_500_000);
    assert_eq!(report.totals.net, report.totals.gross - report.totals.deductions);
}

#[test]
fn test_batch_report_serializes_for_callers() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let report = service
        .render_batch(
            &[CompensationInput::new("", 1_000_000)],
            &PayPeriod::new("2025-02"),
            None,
            OutputFormat::Excel,
            &dir.path().join("batch"),
        )
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["attempted"], 1);
    assert_eq!(json["succeeded"], 0);
    assert_eq!(json["failed"][0]["category"], "format");
    assert!(json["archive"].is_null());
}

#[test]
fn test_batch_keeps_every_employee_with_duplicate_names() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let employees = vec![
        CompensationInput::new("김민수", 3_000_000),
        CompensationInput::new("김민수", 2_000_000),
    ];
    let out = dir.path().join("batch");

    let report = service
        .render_batch(
            &employees,
            &PayPeriod::new("2025-01"),
            Some("template_sample1"),
            OutputFormat::Excel,
            &out,
        )
        .unwrap();

    assert_eq!(report.succeeded, 2);
    let entries = archive_entries(&report.archive.unwrap());
    assert_eq!(entries.len(), report.succeeded);
    assert_eq!(
        entries,
        vec!["김민수_2_payslip.xlsx".to_string(), "김민수_payslip.xlsx".to_string()]
    );
    assert!(out.join("김민수_payslip.xlsx").exists());
    assert!(out.join("김민수_2_payslip.xlsx").exists());
}

#[test]
fn test_batch_file_with_bad_record_renders_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let service = create_test_service(dir.path(), None);
    let entries = parse_batch_entries(
        r#"[
            {"name": "김철수", "base_salary": 3000000, "dependents": 1},
            {"name": "박문자", "base_salary": "삼백만"},
            {"name": "이영희", "base_salary": 2500000}
        ]"#,
        "employees.json",
    )
    .unwrap();

    let report = service
        .render_batch_entries(
            &entries,
            &PayPeriod::new("2025-01"),
            None,
            OutputFormat::Excel,
            &dir.path().join("batch"),
        )
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed_names(), vec!["박문자"]);
    assert_eq!(report.failed[0].category, ErrorCategory::Format);
    assert_eq!(archive_entries(&report.archive.unwrap()).len(), 2);
}
