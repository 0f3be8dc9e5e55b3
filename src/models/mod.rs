//! Core data models for the payslip engine.
//!
//! This module contains the compensation input, the calculated breakdown,
//! the pay period, and the render request that flow between the calculator
//! and the renderers.

mod calculation_result;
mod employee;
mod pay_period;
mod render_request;

pub use calculation_result::{LineItem, PayrollBreakdown, format_thousands, format_won};
pub use employee::{CompensationInput, MAX_AMOUNT, mask_national_id};
pub use pay_period::PayPeriod;
pub use render_request::{
    OutputFormat, PayslipData, RenderRequest, UniqueStems, payslip_path, payslip_stem,
};
