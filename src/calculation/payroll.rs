//! Full payroll deduction calculation.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::StatutoryTables;
use crate::models::{CompensationInput, PayrollBreakdown};

use super::income_tax::{calculate_income_tax, calculate_local_tax, dependent_deduction};
use super::insurance::{calculate_insurances, floor_won};

/// Calculates the payroll breakdown for one employee.
///
/// This is a pure function with no I/O. It never fails: inputs are expected
/// to have passed [`CompensationInput::validate`], and negative values that
/// did not are carried through the arithmetic unchanged. Amounts beyond
/// `i64` saturate rather than overflow.
///
/// # Algorithm
///
/// 1. `overtime_pay = floor(overtime_hours * overtime_rate)` when the rate is positive
/// 2. `gross = base + overtime_pay + bonus`
/// 3. Insurances on the capped base salary, long-term care on health insurance
/// 4. `taxable = max(0, gross - insurances - dependent_deduction)`
/// 5. Income tax from the bracket table, local tax from income tax
///
/// # Examples
///
/// ```
/// use payslip_engine::calculation::calculate;
/// use payslip_engine::config::StatutoryTables;
/// use payslip_engine::models::CompensationInput;
/// use rust_decimal::Decimal;
///
/// let mut input = CompensationInput::new("홍길동", 3_000_000);
/// input.overtime_hours = Decimal::from(10);
/// input.overtime_rate = 10_000;
/// input.dependents = 1;
///
/// let breakdown = calculate(&input, &StatutoryTables::default());
/// assert_eq!(breakdown.gross_pay, 3_100_000);
/// assert_eq!(breakdown.net_pay, 2_521_229);
/// ```
pub fn calculate(input: &CompensationInput, tables: &StatutoryTables) -> PayrollBreakdown {
    let overtime_pay = if input.overtime_rate > 0 {
        floor_won(input.overtime_hours.saturating_mul(Decimal::from(input.overtime_rate)))
    } else {
        0
    };
    let gross_pay = input
        .base_salary
        .saturating_add(overtime_pay)
        .saturating_add(input.bonus);

    let insurances = calculate_insurances(input.base_salary, tables);
    let dependent_deduction = dependent_deduction(input.dependents, tables);

    let taxable = gross_pay
        .saturating_sub(insurances.total())
        .saturating_sub(dependent_deduction)
        .max(0);
    let income_tax = calculate_income_tax(taxable, tables);
    let local_income_tax = calculate_local_tax(income_tax, tables);

    let total_deduction = insurances
        .total()
        .saturating_add(income_tax)
        .saturating_add(local_income_tax);
    let net_pay = gross_pay.saturating_sub(total_deduction);

    debug!(gross_pay, taxable, total_deduction, net_pay, "payroll calculated");

    PayrollBreakdown {
        base_salary: input.base_salary,
        overtime_pay,
        bonus: input.bonus,
        gross_pay,
        national_pension: insurances.national_pension,
        health_insurance: insurances.health_insurance,
        long_term_care: insurances.long_term_care,
        employment_insurance: insurances.employment_insurance,
        dependent_deduction,
        income_tax,
        local_income_tax,
        total_deduction,
        net_pay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsuranceKind;
    use crate::models::MAX_AMOUNT;
    use proptest::prelude::*;

    fn create_test_input(base_salary: i64, dependents: u32) -> CompensationInput {
        CompensationInput {
            dependents,
            ..CompensationInput::new("홍길동", base_salary)
        }
    }

    fn tables() -> StatutoryTables {
        StatutoryTables::default()
    }

    #[test]
    fn test_reference_scenario() {
        let mut input = create_test_input(3_000_000, 1);
        input.overtime_hours = Decimal::from(10);
        input.overtime_rate = 10_000;

        let breakdown = calculate(&input, &tables());

        assert_eq!(breakdown.overtime_pay, 100_000);
        assert_eq!(breakdown.gross_pay, 3_100_000);
        assert_eq!(breakdown.national_pension, 135_000);
        assert_eq!(breakdown.health_insurance, 106_350);
        assert_eq!(breakdown.long_term_care, 13_772);
        assert_eq!(breakdown.employment_insurance, 27_000);
        assert_eq!(breakdown.dependent_deduction, 300_000);
        // taxable = 3,100,000 - 282,122 - 300,000 = 2,517,878
        assert_eq!(breakdown.income_tax, 269_681);
        assert_eq!(breakdown.local_income_tax, 26_968);
        assert_eq!(breakdown.total_deduction, 578_771);
        assert_eq!(breakdown.net_pay, 2_521_229);
        assert!(breakdown.verify_invariants());
    }

    #[test]
    fn test_overtime_ignored_without_rate() {
        let mut input = create_test_input(3_000_000, 1);
        input.overtime_hours = Decimal::from(10);
        assert_eq!(calculate(&input, &tables()).overtime_pay, 0);
    }

    #[test]
    fn test_fractional_overtime_hours_floor() {
        let mut input = create_test_input(0, 0);
        input.overtime_hours = Decimal::new(15, 1);
        input.overtime_rate = 10_001;
        // 1.5 * 10,001 = 15,001.5
        assert_eq!(calculate(&input, &tables()).overtime_pay, 15_001);
    }

    #[test]
    fn test_dependents_zero_uses_first_entry() {
        let breakdown = calculate(&create_test_input(3_000_000, 0), &tables());
        assert_eq!(breakdown.dependent_deduction, 150_000);
    }

    #[test]
    fn test_dependents_seven_uses_fourth_entry() {
        let seven = calculate(&create_test_input(3_000_000, 7), &tables());
        let four = calculate(&create_test_input(3_000_000, 4), &tables());
        assert_eq!(seven.dependent_deduction, 750_000);
        assert_eq!(seven, four);
    }

    #[test]
    fn test_low_income_has_no_income_tax() {
        let breakdown = calculate(&create_test_input(300_000, 4), &tables());
        assert_eq!(breakdown.income_tax, 0);
        assert_eq!(breakdown.local_income_tax, 0);
        assert!(breakdown.verify_invariants());
    }

    #[test]
    fn test_bonus_is_taxed_but_not_insured() {
        let mut input = create_test_input(3_000_000, 1);
        let without = calculate(&input, &tables());
        input.bonus = 1_000_000;
        let with = calculate(&input, &tables());
        assert_eq!(with.national_pension, without.national_pension);
        assert!(with.income_tax > without.income_tax);
    }

    #[test]
    fn test_zero_input() {
        let breakdown = calculate(&create_test_input(0, 0), &tables());
        assert_eq!(breakdown, PayrollBreakdown {
            dependent_deduction: 150_000,
            ..PayrollBreakdown::default()
        });
    }

    #[test]
    fn test_extreme_overtime_saturates_without_panic() {
        let mut input = create_test_input(3_000_000, 0);
        input.overtime_hours = Decimal::from(10_000_000_000_i64);
        input.overtime_rate = 10_000_000_000;

        let breakdown = calculate(&input, &tables());

        assert_eq!(breakdown.overtime_pay, i64::MAX);
        assert_eq!(breakdown.gross_pay, i64::MAX);
        assert!(breakdown.net_pay <= breakdown.gross_pay);
        assert!(!breakdown.verify_invariants());
    }

    proptest! {
        #[test]
        fn prop_any_amounts_calculate_without_panic(
            base in any::<i64>(),
            hours in any::<i64>(),
            rate in any::<i64>(),
            bonus in any::<i64>(),
        ) {
            let input = CompensationInput {
                overtime_hours: Decimal::from(hours),
                overtime_rate: rate,
                bonus,
                ..CompensationInput::new("prop", base)
            };
            let breakdown = calculate(&input, &tables());
            prop_assert!(breakdown.income_tax >= 0);
            prop_assert!(breakdown.local_income_tax >= 0);
        }

        #[test]
        fn prop_validated_input_keeps_invariants(
            base in 1i64..=MAX_AMOUNT,
            hours in 0i64..1_000_000,
            rate in 0i64..1_000_000,
            bonus in 0i64..=MAX_AMOUNT,
        ) {
            let input = CompensationInput {
                overtime_hours: Decimal::from(hours),
                overtime_rate: rate,
                bonus,
                ..CompensationInput::new("prop", base)
            };
            prop_assert!(input.validate().is_ok());
            prop_assert!(calculate(&input, &tables()).verify_invariants());
        }

        #[test]
        fn prop_invariants_hold(
            base in 0i64..200_000_000,
            hours in 0i64..400,
            rate in 0i64..100_000,
            bonus in 0i64..50_000_000,
            dependents in 0u32..10,
        ) {
            let input = CompensationInput {
                overtime_hours: Decimal::from(hours),
                overtime_rate: rate,
                bonus,
                dependents,
                ..CompensationInput::new("prop", base)
            };
            let breakdown = calculate(&input, &tables());
            prop_assert_eq!(breakdown.gross_pay, base + breakdown.overtime_pay + bonus);
            prop_assert!(breakdown.verify_invariants());
            prop_assert!(breakdown.total_deduction >= 0);
        }

        #[test]
        fn prop_insurance_never_exceeds_capped_amount(base in 0i64..10_000_000_000) {
            let tables = tables();
            for kind in InsuranceKind::ALL {
                let entry = tables.insurance.get(kind);
                let ceiling = floor_won(Decimal::from(entry.cap) * entry.rate);
                let amount = crate::calculation::calculate_insurance(base, kind, &tables);
                prop_assert!(amount <= ceiling);
                prop_assert!(amount >= 0);
            }
        }
    }
}
