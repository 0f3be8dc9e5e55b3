//! Pay period label.
//!
//! This module contains [`PayPeriod`], the period a payslip is issued for.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The pay period a payslip covers, e.g. `2025-01`.
///
/// The label is kept verbatim; [`PayPeriod::formatted`] produces the
/// human form used in document headers.
///
/// # Example
///
/// ```
/// use payslip_engine::models::PayPeriod;
///
/// let period = PayPeriod::new("2025-01");
/// assert_eq!(period.formatted(), "2025년 01월");
/// assert_eq!(PayPeriod::new("1월분").formatted(), "1월분");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayPeriod {
    label: String,
}

impl PayPeriod {
    /// Creates a period from its raw label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Returns the raw label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true if the label is empty.
    pub fn is_empty(&self) -> bool {
        self.label.trim().is_empty()
    }

    /// Returns `"<year>년 <month>월"` for a `YYYY-MM` label, otherwise the raw label.
    pub fn formatted(&self) -> String {
        match self.label.split_once('-') {
            Some((year, month))
                if !year.is_empty() && !month.is_empty() && !month.contains('-') =>
            {
                format!("{year}년 {month}월")
            }
            _ => self.label.clone(),
        }
    }

    /// Returns the `"지급기간: <label>"` header line.
    pub fn header(&self) -> String {
        format!("지급기간: {}", self.label)
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl From<&str> for PayPeriod {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_year_month() {
        assert_eq!(PayPeriod::new("2025-12").formatted(), "2025년 12월");
    }

    #[test]
    fn test_formatted_passthrough_for_other_labels() {
        assert_eq!(PayPeriod::new("2025").formatted(), "2025");
        assert_eq!(PayPeriod::new("2025-01-15").formatted(), "2025-01-15");
        assert_eq!(PayPeriod::new("-01").formatted(), "-01");
    }

    #[test]
    fn test_header() {
        assert_eq!(PayPeriod::new("2025-01").header(), "지급기간: 2025-01");
    }

    #[test]
    fn test_serde_is_transparent() {
        let period: PayPeriod = serde_json::from_str("\"2025-03\"").unwrap();
        assert_eq!(period.label(), "2025-03");
        assert_eq!(serde_json::to_string(&period).unwrap(), "\"2025-03\"");
    }

    #[test]
    fn test_is_empty() {
        assert!(PayPeriod::new("  ").is_empty());
        assert!(!PayPeriod::new("2025-01").is_empty());
    }
}
