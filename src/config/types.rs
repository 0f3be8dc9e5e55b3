//! Configuration types for deduction calculation and rendering.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Every type also has a
//! built-in default so the engine works without any files on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Rate and monthly cap for one statutory insurance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsuranceRate {
    /// The employee contribution rate (e.g., 0.045 for 4.5%).
    pub rate: Decimal,
    /// The maximum base salary the rate applies to.
    pub cap: i64,
}

/// The statutory insurances computed directly from base salary.
///
/// Long-term care is derived from the health insurance amount and is
/// therefore not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsuranceKind {
    /// National pension.
    NationalPension,
    /// National health insurance.
    HealthInsurance,
    /// Employment insurance.
    EmploymentInsurance,
}

impl InsuranceKind {
    /// All kinds in display order.
    pub const ALL: [InsuranceKind; 3] = [
        InsuranceKind::NationalPension,
        InsuranceKind::HealthInsurance,
        InsuranceKind::EmploymentInsurance,
    ];
}

/// Insurance configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsuranceTable {
    /// National pension rate and cap.
    pub national_pension: InsuranceRate,
    /// Health insurance rate and cap.
    pub health_insurance: InsuranceRate,
    /// Employment insurance rate and cap.
    pub employment_insurance: InsuranceRate,
    /// Long-term care rate, applied to the health insurance amount.
    pub long_term_care_rate: Decimal,
}

impl InsuranceTable {
    /// Returns the rate entry for an insurance kind.
    pub fn get(&self, kind: InsuranceKind) -> &InsuranceRate {
        match kind {
            InsuranceKind::NationalPension => &self.national_pension,
            InsuranceKind::HealthInsurance => &self.health_insurance,
            InsuranceKind::EmploymentInsurance => &self.employment_insurance,
        }
    }
}

/// One progressive income tax bracket.
///
/// A bracket applies when `start <= taxable < end`. The final bracket has no
/// `end` and covers every amount above the last explicit boundary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxBracket {
    /// Inclusive lower bound.
    pub start: i64,
    /// Exclusive upper bound, `None` for the open-ended final bracket.
    #[serde(default)]
    pub end: Option<i64>,
    /// Marginal rate.
    pub rate: Decimal,
    /// Fixed progressive deduction subtracted after applying the rate.
    pub deduction: i64,
}

impl TaxBracket {
    /// Returns true if `taxable` falls within this bracket.
    pub fn contains(&self, taxable: i64) -> bool {
        taxable >= self.start && self.end.is_none_or(|end| taxable < end)
    }
}

/// Income tax section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomeTaxTable {
    /// Ordered brackets; the last one is open-ended.
    pub brackets: Vec<TaxBracket>,
}

/// Complete statutory rate tables used by the calculator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatutoryTables {
    /// Insurance rates and caps.
    pub insurance: InsuranceTable,
    /// Income tax brackets.
    pub income_tax: IncomeTaxTable,
    /// Local income tax rate applied to income tax.
    pub local_tax_rate: Decimal,
    /// Monthly deduction by dependent count (0..=4).
    pub dependent_deductions: BTreeMap<u32, i64>,
    /// Deduction used when the clamped dependent count has no table entry.
    pub default_dependent_deduction: i64,
}

/// Dependent counts at or above this value share one deduction.
pub const MAX_DEPENDENT_KEY: u32 = 4;

impl Default for StatutoryTables {
    fn default() -> Self {
        Self {
            insurance: InsuranceTable {
                national_pension: InsuranceRate {
                    rate: Decimal::new(45, 3),
                    cap: 6_170_000,
                },
                health_insurance: InsuranceRate {
                    rate: Decimal::new(3545, 5),
                    cap: 127_056_982,
                },
                employment_insurance: InsuranceRate {
                    rate: Decimal::new(9, 3),
                    cap: 10_000_000_000,
                },
                long_term_care_rate: Decimal::new(1295, 4),
            },
            income_tax: IncomeTaxTable {
                brackets: vec![
                    TaxBracket {
                        start: 0,
                        end: Some(1_200_000),
                        rate: Decimal::new(6, 2),
                        deduction: 0,
                    },
                    TaxBracket {
                        start: 1_200_000,
                        end: Some(4_600_000),
                        rate: Decimal::new(15, 2),
                        deduction: 108_000,
                    },
                    TaxBracket {
                        start: 4_600_000,
                        end: Some(8_800_000),
                        rate: Decimal::new(24, 2),
                        deduction: 522_000,
                    },
                    TaxBracket {
                        start: 8_800_000,
                        end: Some(15_000_000),
                        rate: Decimal::new(35, 2),
                        deduction: 1_490_000,
                    },
                    TaxBracket {
                        start: 15_000_000,
                        end: None,
                        rate: Decimal::new(38, 2),
                        deduction: 1_940_000,
                    },
                ],
            },
            local_tax_rate: Decimal::new(1, 1),
            dependent_deductions: BTreeMap::from([
                (0, 150_000),
                (1, 300_000),
                (2, 450_000),
                (3, 600_000),
                (4, 750_000),
            ]),
            default_dependent_deduction: 600_000,
        }
    }
}

/// External converter settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Seconds to wait for the office converter before giving up.
    pub timeout_secs: u64,
    /// Executable names looked up on `PATH`, in order.
    pub program_names: Vec<String>,
    /// Fixed install locations checked after the `PATH` lookup.
    pub known_locations: Vec<PathBuf>,
    /// Whether to search `PATH` at all.
    pub search_path: bool,
    /// Whether to refresh the system font cache before converting.
    pub refresh_font_cache: bool,
    /// Seconds to wait for the font cache refresh.
    pub font_cache_timeout_secs: u64,
    /// Whether the platform automation strategy may be used.
    pub automation_enabled: bool,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            program_names: vec!["soffice".to_string(), "libreoffice".to_string()],
            known_locations: vec![
                PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"),
                PathBuf::from("/usr/bin/libreoffice"),
                PathBuf::from("/usr/local/bin/libreoffice"),
                PathBuf::from("/usr/bin/soffice"),
                PathBuf::from(r"C:\Program Files\LibreOffice\program\soffice.exe"),
            ],
            search_path: true,
            refresh_font_cache: true,
            font_cache_timeout_secs: 10,
            automation_enabled: true,
        }
    }
}

/// Font settings for the procedural PDF renderer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    /// CJK-capable TrueType fonts, tried in order.
    pub cjk_candidates: Vec<PathBuf>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            cjk_candidates: vec![
                PathBuf::from("assets/fonts/NanumGothic.ttf"),
                PathBuf::from(
                    "assets/fonts/나눔 글꼴/나눔고딕/NanumFontSetup_TTF_GOTHIC/NanumGothic.ttf",
                ),
                PathBuf::from("/usr/share/fonts/truetype/nanum/NanumGothic.ttf"),
            ],
        }
    }
}

/// Rendering settings loaded from `renderer.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Bundled design assets (templates and mapping files).
    pub designs_dir: PathBuf,
    /// Development sample templates.
    pub sample_dir: PathBuf,
    /// Packaged resource root, if the engine runs from an installed bundle.
    pub resource_dir: Option<PathBuf>,
    /// Directory for intermediate files; the OS temp directory when unset.
    pub temp_dir: Option<PathBuf>,
    /// Converter settings.
    pub converter: ConverterSettings,
    /// Font settings.
    pub fonts: FontSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            designs_dir: PathBuf::from("assets/designs"),
            sample_dir: PathBuf::from("sample"),
            resource_dir: None,
            temp_dir: None,
            converter: ConverterSettings::default(),
            fonts: FontSettings::default(),
        }
    }
}

impl RenderSettings {
    /// Returns the directory for intermediate files.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
