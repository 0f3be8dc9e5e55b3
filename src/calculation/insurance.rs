//! Statutory insurance contributions.
//!
//! Each insurance applies its rate to the base salary capped at the
//! insurance's ceiling. Long-term care is charged on the health insurance
//! amount rather than on salary.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::{InsuranceKind, StatutoryTables};

/// The four insurance amounts for one base salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsuranceAmounts {
    /// National pension.
    pub national_pension: i64,
    /// Health insurance.
    pub health_insurance: i64,
    /// Long-term care, derived from health insurance.
    pub long_term_care: i64,
    /// Employment insurance.
    pub employment_insurance: i64,
}

impl InsuranceAmounts {
    /// Sum of all four insurances.
    pub fn total(&self) -> i64 {
        self.national_pension
            .saturating_add(self.health_insurance)
            .saturating_add(self.long_term_care)
            .saturating_add(self.employment_insurance)
    }
}

/// Calculates one insurance contribution.
///
/// # Arguments
///
/// * `base_salary` - Monthly base salary in won
/// * `kind` - Which insurance to calculate
/// * `tables` - Statutory rates and caps
///
/// # Returns
///
/// `floor(min(base_salary, cap) * rate)`.
///
/// # Examples
///
/// ```
/// use payslip_engine::calculation::calculate_insurance;
/// use payslip_engine::config::{InsuranceKind, StatutoryTables};
///
/// let tables = StatutoryTables::default();
/// // Above the national pension cap the amount stops growing.
/// assert_eq!(
///     calculate_insurance(20_000_000, InsuranceKind::NationalPension, &tables),
///     277_650
/// );
/// ```
pub fn calculate_insurance(base_salary: i64, kind: InsuranceKind, tables: &StatutoryTables) -> i64 {
    let entry = tables.insurance.get(kind);
    let capped = base_salary.min(entry.cap);
    floor_won(Decimal::from(capped) * entry.rate)
}

/// Calculates all four insurances for a base salary.
pub fn calculate_insurances(base_salary: i64, tables: &StatutoryTables) -> InsuranceAmounts {
    let health_insurance =
        calculate_insurance(base_salary, InsuranceKind::HealthInsurance, tables);
    InsuranceAmounts {
        national_pension: calculate_insurance(base_salary, InsuranceKind::NationalPension, tables),
        health_insurance,
        long_term_care: floor_won(
            Decimal::from(health_insurance) * tables.insurance.long_term_care_rate,
        ),
        employment_insurance: calculate_insurance(
            base_salary,
            InsuranceKind::EmploymentInsurance,
            tables,
        ),
    }
}

/// Floors a decimal amount to whole won, saturating at the `i64` range.
pub(crate) fn floor_won(value: Decimal) -> i64 {
    value.floor().to_i64().unwrap_or(if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}
