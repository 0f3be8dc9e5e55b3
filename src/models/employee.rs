//! Employee compensation input.
//!
//! This module defines [`CompensationInput`], the frozen field set every
//! caller supplies for one employee, and the national id masking used
//! before any identity data reaches a document.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Largest amount in won accepted for any single pay component.
///
/// Three components at this ceiling still sum well inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Compensation and identity data for one employee and one pay period.
///
/// Numeric fields that are absent from the input default to zero.
/// Bank fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationInput {
    /// Employee name.
    pub name: String,
    /// Resident registration number. Never written anywhere unmasked.
    pub national_id: String,
    /// Date the employee joined.
    pub hire_date: Option<NaiveDate>,
    /// Monthly base salary in won.
    pub base_salary: i64,
    /// Overtime hours worked in the period (fractional hours allowed).
    pub overtime_hours: Decimal,
    /// Overtime pay per hour in won.
    pub overtime_rate: i64,
    /// Bonus in won.
    pub bonus: i64,
    /// Number of dependents.
    pub dependents: u32,
    /// Department name.
    pub department: String,
    /// Position or title.
    pub position: String,
    /// Bank name.
    pub bank_name: String,
    /// Bank account number.
    pub account_number: String,
    /// Free-form deduction note.
    pub deduction_note: String,
}

impl CompensationInput {
    /// Creates an input with a name and base salary and every other field zeroed.
    ///
    /// # Examples
    ///
    /// ```
    /// use payslip_engine::models::CompensationInput;
    ///
    /// let input = CompensationInput::new("홍길동", 3_000_000);
    /// assert_eq!(input.base_salary, 3_000_000);
    /// assert_eq!(input.bonus, 0);
    /// ```
    pub fn new(name: impl Into<String>, base_salary: i64) -> Self {
        Self {
            name: name.into(),
            base_salary,
            ..Self::default()
        }
    }

    /// Rejects an empty name, a base salary that is not positive, negative
    /// amounts, and amounts above [`MAX_AMOUNT`].
    ///
    /// The national id and hire date may be absent; documents then show
    /// them blank.
    ///
    /// # Returns
    ///
    /// `Ok(())` when the input can be calculated and rendered, otherwise
    /// [`EngineError::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if self.base_salary <= 0 {
            return Err(invalid("base_salary", "must be positive"));
        }
        for (field, value) in [
            ("base_salary", self.base_salary),
            ("overtime_rate", self.overtime_rate),
            ("bonus", self.bonus),
        ] {
            if value < 0 {
                return Err(invalid(field, "must not be negative"));
            }
            if value > MAX_AMOUNT {
                return Err(invalid(field, "exceeds the maximum amount"));
            }
        }
        if self.overtime_hours.is_sign_negative() && !self.overtime_hours.is_zero() {
            return Err(invalid("overtime_hours", "must not be negative"));
        }
        let overtime_pay = self
            .overtime_hours
            .checked_mul(Decimal::from(self.overtime_rate));
        if overtime_pay.is_none_or(|pay| pay > Decimal::from(MAX_AMOUNT)) {
            return Err(invalid("overtime_hours", "overtime pay exceeds the maximum amount"));
        }
        Ok(())
    }

    /// Returns the masked national id.
    pub fn masked_national_id(&self) -> String {
        mask_national_id(&self.national_id)
    }

    /// Returns "department / position", whichever half exists, or an empty string.
    pub fn department_position(&self) -> String {
        let department = self.department.trim();
        let position = self.position.trim();
        match (department.is_empty(), position.is_empty()) {
            (false, false) => format!("{department} / {position}"),
            (false, true) => department.to_string(),
            (true, false) => position.to_string(),
            (true, true) => String::new(),
        }
    }

    /// Returns the hire date as `YYYY-MM-DD`, or an empty string.
    pub fn hire_date_label(&self) -> String {
        self.hire_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

fn invalid(field: &str, message: &str) -> EngineError {
    EngineError::InvalidInput {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Masks a resident registration number for display.
///
/// Only digits are considered. With at least six digits the first six are
/// kept and the rest replaced by `-*******`; with fewer the whole value is
/// hidden. An empty value stays empty.
///
/// # Examples
///
/// ```
/// use payslip_engine::models::mask_national_id;
///
/// assert_eq!(mask_national_id("900101-1234567"), "900101-*******");
/// assert_eq!(mask_national_id("1234"), "*******");
/// assert_eq!(mask_national_id(""), "");
/// ```
pub fn mask_national_id(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= 6 {
        format!("{}-*******", &digits[..6])
    } else {
        "*******".to_string()
    }
}
