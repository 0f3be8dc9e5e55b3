//! Deduction calculation for the payslip engine.
//!
//! This module turns a [`CompensationInput`](crate::models::CompensationInput)
//! into a [`PayrollBreakdown`](crate::models::PayrollBreakdown): capped
//! statutory insurances, the dependent deduction, progressive income tax,
//! and local income tax. All rates come from
//! [`StatutoryTables`](crate::config::StatutoryTables).

mod income_tax;
mod insurance;
mod payroll;

pub use income_tax::{calculate_income_tax, calculate_local_tax, dependent_deduction};
pub use insurance::{InsuranceAmounts, calculate_insurance, calculate_insurances};
pub use payroll::calculate;
