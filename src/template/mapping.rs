//! Declarative cell mappings and the resolver that writes through them.
//!
//! A mapping file names where each payslip value lands:
//!
//! ```json
//! { "cell_mapping": { "employee_name": "C3", "basic_salary": "B7", "net_pay": "H25" } }
//! ```
//!
//! Writes go through [`CellMappingResolver::write`], which redirects any
//! address inside a merged range to that range's top-left anchor.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{PayslipData, format_thousands, format_won};
use crate::sheet::{CellAddress, CellValue, Sheet};

/// A payslip row a template can show: mapping key and printed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateItem {
    /// Mapping key.
    pub key: &'static str,
    /// Label printed in label+value blocks.
    pub label: &'static str,
}

const fn item(key: &'static str, label: &'static str) -> TemplateItem {
    TemplateItem { key, label }
}

/// Payment rows in template order. Items without a computed amount show zero.
pub const PAYMENT_ITEMS: [TemplateItem; 9] = [
    item("basic_salary", "기본급"),
    item("meal_allowance", "식대"),
    item("vehicle_maintenance", "차량유지비"),
    item("position_allowance", "직책수당"),
    item("service_allowance", "근속수당"),
    item("overtime", "연장수당"),
    item("oncall_allowance", "당직수당"),
    item("bonus", "상여금"),
    item("other", "기타"),
];

/// Deduction rows in template order. Items without a computed amount show zero.
pub const DEDUCTION_ITEMS: [TemplateItem; 8] = [
    item("national_pension", "국민연금"),
    item("health_insurance", "건강보험"),
    item("long_term_care", "노인장기요양보험"),
    item("employment_insurance", "고용보험"),
    item("income_tax", "소득세"),
    item("local_income_tax", "지방소득세"),
    item("mutual_aid", "상조회비"),
    item("advance_payment", "가불금"),
];

/// Keys that always receive raw numbers, since formulas depend on them.
pub const TOTAL_KEYS: [&str; 3] = ["total_payment", "total_deduction", "net_pay"];

const HEADER_KEYS: [&str; 6] = [
    "period",
    "payment_period",
    "employee_name",
    "department_position",
    "resident_number",
    "join_date",
];

fn is_known_key(key: &str) -> bool {
    HEADER_KEYS.contains(&key)
        || TOTAL_KEYS.contains(&key)
        || PAYMENT_ITEMS.iter().any(|item| item.key == key)
        || DEDUCTION_ITEMS.iter().any(|item| item.key == key)
}

#[derive(Deserialize)]
struct MappingFile {
    #[serde(default)]
    cell_mapping: BTreeMap<String, String>,
}

/// Named key to cell address table for one design.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellMapping {
    entries: BTreeMap<String, CellAddress>,
}

impl CellMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a mapping file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be read,
    /// [`EngineError::ConfigParseError`] if it is not a valid mapping.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_json(&content, path)
    }

    /// Parses a mapping document. `origin` is only used in error messages.
    pub fn from_json(content: &str, origin: &Path) -> EngineResult<Self> {
        let parse_error = |message: String| EngineError::ConfigParseError {
            path: origin.display().to_string(),
            message,
        };
        let file: MappingFile =
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (key, raw) in file.cell_mapping {
            let address: CellAddress = raw
                .parse()
                .map_err(|e: EngineError| parse_error(format!("key '{key}': {e}")))?;
            if !is_known_key(&key) {
                warn!(key = %key, path = %origin.display(), "mapping key is not used by any renderer");
            }
            entries.insert(key, address);
        }
        Ok(Self { entries })
    }

    /// Adds or replaces one entry.
    pub fn insert(&mut self, key: impl Into<String>, address: CellAddress) {
        self.entries.insert(key.into(), address);
    }

    /// Returns the address mapped to `key`.
    pub fn get(&self, key: &str) -> Option<CellAddress> {
        self.entries.get(key).copied()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Fills a sheet from a [`CellMapping`].
#[derive(Debug, Clone, Copy)]
pub struct CellMappingResolver<'m> {
    mapping: &'m CellMapping,
}

impl<'m> CellMappingResolver<'m> {
    /// Creates a resolver over `mapping`.
    pub fn new(mapping: &'m CellMapping) -> Self {
        Self { mapping }
    }

    /// Writes `value` at `address`, or at its merged-range anchor.
    ///
    /// Returns the cell that was written.
    ///
    /// # Examples
    ///
    /// ```
    /// use payslip_engine::sheet::{CellAddress, Sheet};
    /// use payslip_engine::template::CellMappingResolver;
    ///
    /// let mut sheet = Sheet::new("급여명세서");
    /// sheet.merge("B7:C7".parse().unwrap()).unwrap();
    ///
    /// let written = CellMappingResolver::write(&mut sheet, "C7".parse().unwrap(), "기본급");
    /// assert_eq!(written, "B7".parse::<CellAddress>().unwrap());
    /// ```
    pub fn write(sheet: &mut Sheet, address: CellAddress, value: impl Into<CellValue>) -> CellAddress {
        let anchor = sheet.anchor_for(address);
        if anchor != address {
            debug!(requested = %address, anchor = %anchor, "write redirected to merged anchor");
        }
        sheet.set_value(anchor, value);
        anchor
    }

    /// Writes every mapped payslip value into `sheet`.
    ///
    /// An empty mapping falls back to the fixed legacy cell addresses.
    pub fn fill(&self, sheet: &mut Sheet, data: PayslipData<'_>) {
        if self.mapping.is_empty() {
            warn!("cell mapping is empty; using default cell addresses");
            fill_default(sheet, data);
            return;
        }

        self.fill_header(sheet, data);

        let breakdown = data.breakdown;
        for item in PAYMENT_ITEMS {
            let Some(address) = self.mapping.get(item.key) else {
                continue;
            };
            let amount = breakdown.amount_for(item.key).unwrap_or(0);
            let text = if amount > 0 {
                format!("{} : {}", item.label, format_won(amount))
            } else {
                item.label.to_string()
            };
            write_item(sheet, address, text, amount);
        }
        for item in DEDUCTION_ITEMS {
            let Some(address) = self.mapping.get(item.key) else {
                continue;
            };
            let amount = breakdown.amount_for(item.key).unwrap_or(0);
            let text = if amount > 0 {
                format!("{} : {}", item.label, format_thousands(amount))
            } else {
                format!("{} : 0", item.label)
            };
            write_item(sheet, address, text, amount);
        }
        for key in TOTAL_KEYS {
            if let Some(address) = self.mapping.get(key) {
                let amount = breakdown.amount_for(key).unwrap_or(0);
                Self::write(sheet, address, amount);
            }
        }
    }

    fn fill_header(&self, sheet: &mut Sheet, data: PayslipData<'_>) {
        let input = data.input;
        if !data.period.is_empty() {
            if let Some(address) = self.mapping.get("period") {
                Self::write(sheet, address, data.period.header());
            }
            if let Some(address) = self.mapping.get("payment_period") {
                Self::write(sheet, address, data.period.formatted());
            }
        }
        if let Some(address) = self.mapping.get("employee_name") {
            Self::write(sheet, address, input.name.as_str());
        }
        if let Some(address) = self.mapping.get("department_position") {
            Self::write(sheet, address, input.department_position());
        }
        if let Some(address) = self.mapping.get("resident_number") {
            Self::write(
                sheet,
                address,
                format!("주민번호 : {}", input.masked_national_id()),
            );
        }
        if let (Some(address), Some(_)) = (self.mapping.get("join_date"), input.hire_date) {
            Self::write(sheet, address, input.hire_date_label());
        }
    }
}

/// Composed text inside a label+value block, the raw amount anywhere else.
fn write_item(sheet: &mut Sheet, address: CellAddress, text: String, amount: i64) {
    match sheet.merged_range_at(address) {
        Some(range) if range.is_label_value_block() => {
            CellMappingResolver::write(sheet, address, text);
        }
        _ => {
            CellMappingResolver::write(sheet, address, amount);
        }
    }
}

const DEFAULT_PERIOD: CellAddress = CellAddress::new(1, 0);
const DEFAULT_NET_PAY: CellAddress = CellAddress::new(22, 0);
const PERIOD_PLACEHOLDER: &str = "{PERIOD}";
const NET_PAY_PLACEHOLDER: &str = "{NET_PAY}";

/// Fills the fixed cells used by templates without a mapping file.
///
/// `A2` and `A23` are only replaced when they hold the `{PERIOD}` and
/// `{NET_PAY}` placeholders.
fn fill_default(sheet: &mut Sheet, data: PayslipData<'_>) {
    let input = data.input;
    let b = data.breakdown;

    if !data.period.is_empty() && has_placeholder(sheet, DEFAULT_PERIOD, PERIOD_PLACEHOLDER) {
        CellMappingResolver::write(sheet, DEFAULT_PERIOD, data.period.header());
    }

    let column_b = |row: u32| CellAddress::new(row - 1, 1);
    CellMappingResolver::write(sheet, column_b(4), input.name.as_str());
    CellMappingResolver::write(sheet, column_b(5), input.masked_national_id());
    CellMappingResolver::write(sheet, column_b(6), input.hire_date_label());

    let amounts = [
        (9, b.base_salary),
        (10, b.overtime_pay),
        (11, b.bonus),
        (12, b.gross_pay),
        (15, b.national_pension),
        (16, b.health_insurance),
        (17, b.long_term_care),
        (18, b.employment_insurance),
        (19, b.income_tax),
        (20, b.local_income_tax),
        (21, b.total_deduction),
    ];
    for (row, amount) in amounts {
        CellMappingResolver::write(sheet, column_b(row), amount);
    }

    if has_placeholder(sheet, DEFAULT_NET_PAY, NET_PAY_PLACEHOLDER) {
        CellMappingResolver::write(
            sheet,
            DEFAULT_NET_PAY,
            format!("실수령액: {}", format_won(b.net_pay)),
        );
    }
}

fn has_placeholder(sheet: &Sheet, address: CellAddress, placeholder: &str) -> bool {
    sheet
        .value(address)
        .and_then(CellValue::as_text)
        .is_some_and(|text| text.contains(placeholder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::calculate;
    use crate::config::StatutoryTables;
    use crate::models::{CompensationInput, PayPeriod, PayrollBreakdown};
    use chrono::NaiveDate;

    fn addr(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    fn create_test_input() -> CompensationInput {
        CompensationInput {
            national_id: "900101-1234567".to_string(),
            hire_date: NaiveDate::from_ymd_opt(2021, 7, 1),
            overtime_hours: rust_decimal::Decimal::from(10),
            overtime_rate: 10_000,
            dependents: 1,
            department: "개발팀".to_string(),
            position: "대리".to_string(),
            ..CompensationInput::new("홍길동", 3_000_000)
        }
    }

    fn create_test_sheet() -> Sheet {
        let mut sheet = Sheet::new("급여명세서");
        for range in ["B7:C7", "B8:C8", "B9:C9", "F7:G7", "F8:G8", "F9:G9", "C3:D3"] {
            sheet.merge(range.parse().unwrap()).unwrap();
        }
        sheet.set_value(addr("H25"), CellValue::Formula("=H23-H24".to_string()));
        sheet
    }

    fn create_test_mapping() -> CellMapping {
        let json = r#"{"cell_mapping": {
            "payment_period": "B2", "period": "E2",
            "employee_name": "D3", "department_position": "F3",
            "resident_number": "B4", "join_date": "F4",
            "basic_salary": "B7", "overtime": "C8", "meal_allowance": "B9",
            "national_pension": "F7", "mutual_aid": "F8", "long_term_care": "G9",
            "bonus": "B10",
            "total_payment": "H23", "total_deduction": "H24", "net_pay": "H25"
        }}"#;
        CellMapping::from_json(json, Path::new("test_mapping.json")).unwrap()
    }

    fn text_at(sheet: &Sheet, s: &str) -> String {
        sheet
            .value(addr(s))
            .and_then(CellValue::as_text)
            .unwrap_or_default()
            .to_string()
    }

    fn fill(sheet: &mut Sheet, mapping: &CellMapping, input: &CompensationInput) -> PayrollBreakdown {
        let breakdown = calculate(input, &StatutoryTables::default());
        let period = PayPeriod::new("2025-01");
        CellMappingResolver::new(mapping).fill(
            sheet,
            PayslipData {
                input,
                breakdown: &breakdown,
                period: &period,
            },
        );
        breakdown
    }

    #[test]
    fn test_write_to_merged_cell_lands_on_anchor() {
        let mut sheet = create_test_sheet();
        let written = CellMappingResolver::write(&mut sheet, addr("G8"), "x");
        assert_eq!(written, addr("F8"));
        assert_eq!(text_at(&sheet, "F8"), "x");
        assert!(sheet.value(addr("G8")).is_none());
    }

    #[test]
    fn test_write_to_plain_cell_lands_on_itself() {
        let mut sheet = create_test_sheet();
        assert_eq!(CellMappingResolver::write(&mut sheet, addr("H23"), 5), addr("H23"));
        assert_eq!(sheet.value(addr("H23")), Some(&CellValue::Integer(5)));
    }

    #[test]
    fn test_fill_header_values() {
        let mut sheet = create_test_sheet();
        fill(&mut sheet, &create_test_mapping(), &create_test_input());

        assert_eq!(text_at(&sheet, "B2"), "2025년 01월");
        assert_eq!(text_at(&sheet, "E2"), "지급기간: 2025-01");
        // D3 lies in C3:D3, so the name lands on C3
        assert_eq!(text_at(&sheet, "C3"), "홍길동");
        assert_eq!(text_at(&sheet, "F3"), "개발팀 / 대리");
        assert_eq!(text_at(&sheet, "B4"), "주민번호 : 900101-*******");
        assert_eq!(text_at(&sheet, "F4"), "2021-07-01");
    }

    #[test]
    fn test_fill_composes_label_value_blocks() {
        let mut sheet = create_test_sheet();
        fill(&mut sheet, &create_test_mapping(), &create_test_input());

        assert_eq!(text_at(&sheet, "B7"), "기본급 : 3,000,000원");
        assert_eq!(text_at(&sheet, "B8"), "연장수당 : 100,000원");
        // display-only payment row keeps its label
        assert_eq!(text_at(&sheet, "B9"), "식대");
        assert_eq!(text_at(&sheet, "F7"), "국민연금 : 135,000");
        assert_eq!(text_at(&sheet, "F8"), "상조회비 : 0");
        assert_eq!(text_at(&sheet, "F9"), "노인장기요양보험 : 13,772");
    }

    #[test]
    fn test_fill_unmerged_item_writes_raw_amount() {
        let mut sheet = create_test_sheet();
        fill(&mut sheet, &create_test_mapping(), &create_test_input());
        assert_eq!(sheet.value(addr("B10")), Some(&CellValue::Integer(0)));
    }

    #[test]
    fn test_fill_totals_are_raw_numbers() {
        let mut sheet = create_test_sheet();
        let breakdown = fill(&mut sheet, &create_test_mapping(), &create_test_input());

        assert_eq!(sheet.value(addr("H23")), Some(&CellValue::Integer(breakdown.gross_pay)));
        assert_eq!(
            sheet.value(addr("H24")),
            Some(&CellValue::Integer(breakdown.total_deduction))
        );
        // the formula is replaced by the computed value
        assert_eq!(sheet.value(addr("H25")), Some(&CellValue::Integer(breakdown.net_pay)));
    }

    #[test]
    fn test_join_date_skipped_without_hire_date() {
        let mut sheet = create_test_sheet();
        let input = CompensationInput {
            hire_date: None,
            ..create_test_input()
        };
        fill(&mut sheet, &create_test_mapping(), &input);
        assert!(sheet.value(addr("F4")).is_none());
    }

    #[test]
    fn test_empty_mapping_uses_default_cells() {
        let mut sheet = Sheet::new("급여명세서");
        sheet.set_value(addr("A2"), "{PERIOD}");
        sheet.set_value(addr("A23"), "{NET_PAY}");
        let breakdown = fill(&mut sheet, &CellMapping::new(), &create_test_input());

        assert_eq!(text_at(&sheet, "A2"), "지급기간: 2025-01");
        assert_eq!(text_at(&sheet, "B4"), "홍길동");
        assert_eq!(text_at(&sheet, "B5"), "900101-*******");
        assert_eq!(sheet.value(addr("B9")), Some(&CellValue::Integer(3_000_000)));
        assert_eq!(sheet.value(addr("B12")), Some(&CellValue::Integer(3_100_000)));
        assert_eq!(
            sheet.value(addr("B21")),
            Some(&CellValue::Integer(breakdown.total_deduction))
        );
        assert_eq!(
            text_at(&sheet, "A23"),
            format!("실수령액: {}", format_won(breakdown.net_pay))
        );
    }

    #[test]
    fn test_default_cells_keep_text_without_placeholder() {
        let mut sheet = Sheet::new("급여명세서");
        sheet.set_value(addr("A2"), "급여 지급기간");
        fill(&mut sheet, &CellMapping::new(), &create_test_input());
        assert_eq!(text_at(&sheet, "A2"), "급여 지급기간");
        assert!(sheet.value(addr("A23")).is_none());
    }

    #[test]
    fn test_mapping_rejects_bad_address() {
        let json = r#"{"cell_mapping": {"net_pay": "7H"}}"#;
        let err = CellMapping::from_json(json, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, EngineError::ConfigParseError { .. }));
        assert!(err.to_string().contains("net_pay"));
    }

    #[test]
    fn test_mapping_without_table_is_empty() {
        let mapping = CellMapping::from_json("{}", Path::new("empty.json")).unwrap();
        assert!(mapping.is_empty());
    }
}
