//! A1-style cell addresses and ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::EngineError;

/// Largest row index (0-based) a worksheet accepts.
pub const MAX_ROW: u32 = 1_048_575;
/// Largest column index (0-based) a worksheet accepts (`XFD`).
pub const MAX_COL: u16 = 16_383;

/// A zero-based cell position, parsed from and displayed as `B7`.
///
/// # Example
///
/// ```
/// use payslip_engine::sheet::CellAddress;
///
/// let address: CellAddress = "B7".parse().unwrap();
/// assert_eq!((address.row, address.col), (6, 1));
/// assert_eq!(address.to_string(), "B7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub col: u16,
}

impl CellAddress {
    /// Creates an address from zero-based indices.
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }
}

fn column_name(col: u16) -> String {
    let mut n = u32::from(col) + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        name.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidCellAddress {
            address: s.to_string(),
        };

        let trimmed = s.trim().trim_start_matches('$');
        let split = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = trimmed.split_at(split);
        let digits = digits.trim_start_matches('$');

        if letters.is_empty() || letters.len() > 3 || digits.is_empty() {
            return Err(invalid());
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = letters.bytes().fold(0u32, |acc, b| {
            acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1
        }) - 1;
        let row = digits.parse::<u32>().map_err(|_| invalid())?;

        if row == 0 || row - 1 > MAX_ROW || col > u32::from(MAX_COL) {
            return Err(invalid());
        }

        Ok(Self {
            row: row - 1,
            col: col as u16,
        })
    }
}

impl<'de> Deserialize<'de> for CellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive rectangular range such as `B7:C7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    /// Top-left cell; the anchor of a merged range.
    pub first: CellAddress,
    /// Bottom-right cell.
    pub last: CellAddress,
}

impl CellRange {
    /// Creates a range, normalizing the corners so `first` is top-left.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            first: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            last: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Returns true if `address` lies inside the range.
    pub fn contains(&self, address: CellAddress) -> bool {
        (self.first.row..=self.last.row).contains(&address.row)
            && (self.first.col..=self.last.col).contains(&address.col)
    }

    /// Returns true if the two ranges share any cell.
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.first.row <= other.last.row
            && other.first.row <= self.last.row
            && self.first.col <= other.last.col
            && other.first.col <= self.last.col
    }

    /// Returns true if the range covers exactly one cell.
    pub fn is_single_cell(&self) -> bool {
        self.first == self.last
    }

    /// Returns true if the range is one row spanning more than one column.
    ///
    /// Itemized payslip rows are merged this way to hold "label : value".
    pub fn is_label_value_block(&self) -> bool {
        self.first.row == self.last.row && self.last.col > self.first.col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}:{}", self.first, self.last)
        }
    }
}

impl FromStr for CellRange {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse()?, b.parse()?)),
            None => {
                let single: CellAddress = s.parse()?;
                Ok(Self::new(single, single))
            }
        }
    }
}

impl<'de> Deserialize<'de> for CellRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
