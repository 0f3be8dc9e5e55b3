//! Payslip engine.
//!
//! This crate computes Korean monthly payroll deductions (national pension,
//! health insurance, long-term care, employment insurance, income tax and
//! local income tax) and renders payslips as spreadsheets and PDFs.
//!
//! Rendering goes through named designs: declarative templates filled via
//! a cell mapping, or the legacy fixed layout. PDFs come from an external
//! office converter when one is installed and are otherwise drawn directly.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod convert;
pub mod design;
pub mod error;
pub mod models;
pub mod pdf;
pub mod service;
pub mod sheet;
pub mod template;
