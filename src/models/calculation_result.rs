//! Payroll breakdown produced by the deduction calculator.
//!
//! This module contains [`PayrollBreakdown`], the integer-won result of a
//! calculation, and the labelled line items every renderer draws from it.

use serde::{Deserialize, Serialize};

/// Every amount produced by one deduction calculation, in won.
///
/// # Invariants
///
/// - `gross_pay == base_salary + overtime_pay + bonus`
/// - `total_deduction == national_pension + health_insurance + long_term_care
///   + employment_insurance + income_tax + local_income_tax`
/// - `net_pay == gross_pay - total_deduction`
///
/// The dependent deduction reduces taxable income only and is not part of
/// `total_deduction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayrollBreakdown {
    /// Base salary.
    pub base_salary: i64,
    /// Overtime hours multiplied by the overtime rate.
    pub overtime_pay: i64,
    /// Bonus.
    pub bonus: i64,
    /// Base salary plus overtime pay plus bonus.
    pub gross_pay: i64,
    /// National pension contribution.
    pub national_pension: i64,
    /// Health insurance contribution.
    pub health_insurance: i64,
    /// Long-term care contribution.
    pub long_term_care: i64,
    /// Employment insurance contribution.
    pub employment_insurance: i64,
    /// Dependent deduction applied to taxable income.
    pub dependent_deduction: i64,
    /// Income tax.
    pub income_tax: i64,
    /// Local income tax.
    pub local_income_tax: i64,
    /// Sum of the four insurances and both taxes.
    pub total_deduction: i64,
    /// Gross pay minus total deduction.
    pub net_pay: i64,
}

/// A labelled amount shown on a payslip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    /// Stable key, matching the cell mapping key for the same row.
    pub key: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Amount in won.
    pub amount: i64,
}

impl PayrollBreakdown {
    /// Returns the payment rows: base salary, overtime pay, and bonus.
    pub fn payment_items(&self) -> [LineItem; 3] {
        [
            LineItem {
                key: "basic_salary",
                label: "기본급",
                amount: self.base_salary,
            },
            LineItem {
                key: "overtime",
                label: "연장근무수당",
                amount: self.overtime_pay,
            },
            LineItem {
                key: "bonus",
                label: "상여금",
                amount: self.bonus,
            },
        ]
    }

    /// Returns the payment rows a summary document shows.
    ///
    /// Base salary is always present; other rows only when positive.
    pub fn visible_payment_items(&self) -> Vec<LineItem> {
        self.payment_items()
            .into_iter()
            .filter(|item| item.key == "basic_salary" || item.amount > 0)
            .collect()
    }

    /// Returns all six deduction rows, including zero amounts.
    pub fn deduction_items(&self) -> [LineItem; 6] {
        [
            LineItem {
                key: "national_pension",
                label: "국민연금",
                amount: self.national_pension,
            },
            LineItem {
                key: "health_insurance",
                label: "건강보험",
                amount: self.health_insurance,
            },
            LineItem {
                key: "long_term_care",
                label: "장기요양보험",
                amount: self.long_term_care,
            },
            LineItem {
                key: "employment_insurance",
                label: "고용보험",
                amount: self.employment_insurance,
            },
            LineItem {
                key: "income_tax",
                label: "소득세",
                amount: self.income_tax,
            },
            LineItem {
                key: "local_income_tax",
                label: "지방소득세",
                amount: self.local_income_tax,
            },
        ]
    }

    /// Returns the amount for a payment or deduction key, if the breakdown has one.
    pub fn amount_for(&self, key: &str) -> Option<i64> {
        match key {
            "total_payment" => Some(self.gross_pay),
            "total_deduction" => Some(self.total_deduction),
            "net_pay" => Some(self.net_pay),
            _ => self
                .payment_items()
                .into_iter()
                .chain(self.deduction_items())
                .find(|item| item.key == key)
                .map(|item| item.amount),
        }
    }

    /// Returns true if all three breakdown invariants hold.
    pub fn verify_invariants(&self) -> bool {
        let deductions = self
            .deduction_items()
            .iter()
            .try_fold(0_i64, |sum, item| sum.checked_add(item.amount));
        let gross = self
            .base_salary
            .checked_add(self.overtime_pay)
            .and_then(|sum| sum.checked_add(self.bonus));
        gross == Some(self.gross_pay)
            && deductions == Some(self.total_deduction)
            && self.gross_pay.checked_sub(self.total_deduction) == Some(self.net_pay)
    }
}

/// Formats an amount with thousands separators.
///
/// # Examples
///
/// ```
/// use payslip_engine::models::format_thousands;
///
/// assert_eq!(format_thousands(1_234_567), "1,234,567");
/// assert_eq!(format_thousands(-1_000), "-1,000");
/// ```
pub fn format_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats an amount as won, e.g. `1,000,000원`.
pub fn format_won(amount: i64) -> String {
    format!("{}원", format_thousands(amount))
}
