//! Progressive income tax and dependent deduction.

use rust_decimal::Decimal;

use crate::config::{MAX_DEPENDENT_KEY, StatutoryTables, TaxBracket};

use super::insurance::floor_won;

/// Calculates monthly income tax for a taxable amount.
///
/// The first bracket containing `taxable` applies
/// `max(0, floor(taxable * rate - deduction))`. The final bracket is
/// open-ended, so every non-negative amount matches exactly one bracket.
/// A table whose last bracket is closed extends that bracket upward.
///
/// # Examples
///
/// ```
/// use payslip_engine::calculation::calculate_income_tax;
/// use payslip_engine::config::StatutoryTables;
///
/// let tables = StatutoryTables::default();
/// assert_eq!(calculate_income_tax(1_000_000, &tables), 60_000);
/// assert_eq!(calculate_income_tax(15_000_000, &tables), 3_760_000);
/// ```
pub fn calculate_income_tax(taxable: i64, tables: &StatutoryTables) -> i64 {
    let brackets = &tables.income_tax.brackets;
    let bracket = brackets
        .iter()
        .find(|bracket| bracket.contains(taxable))
        .or_else(|| brackets.last().filter(|last| taxable >= last.start));

    match bracket {
        Some(bracket) => tax_for_bracket(taxable, bracket),
        None => 0,
    }
}

fn tax_for_bracket(taxable: i64, bracket: &TaxBracket) -> i64 {
    floor_won(Decimal::from(taxable) * bracket.rate - Decimal::from(bracket.deduction)).max(0)
}

/// Calculates local income tax from income tax.
pub fn calculate_local_tax(income_tax: i64, tables: &StatutoryTables) -> i64 {
    floor_won(Decimal::from(income_tax) * tables.local_tax_rate)
}

/// Returns the monthly dependent deduction.
///
/// Counts above four share the entry for four. A count with no table entry
/// uses the configured default.
///
/// # Examples
///
/// ```
/// use payslip_engine::calculation::dependent_deduction;
/// use payslip_engine::config::StatutoryTables;
///
/// let tables = StatutoryTables::default();
/// assert_eq!(dependent_deduction(7, &tables), dependent_deduction(4, &tables));
/// ```
pub fn dependent_deduction(dependents: u32, tables: &StatutoryTables) -> i64 {
    let key = dependents.min(MAX_DEPENDENT_KEY);
    tables
        .dependent_deductions
        .get(&key)
        .copied()
        .unwrap_or(tables.default_dependent_deduction)
}
