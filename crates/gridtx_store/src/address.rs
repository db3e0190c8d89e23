//! Cell addresses.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a single cell in a grid.
///
/// Addresses are 0-based and order row-major, so iterating a sorted set of
/// addresses walks the grid top-to-bottom, left-to-right.
///
/// The canonical *address key* is `"row,col"` (see [`CellAddress::key`]),
/// which round-trips through [`FromStr`] and is also the serialized form, so
/// maps keyed by address serialize as JSON objects. `Display` renders the
/// familiar A1 form instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct CellAddress {
    /// Row index (0-based).
    pub row: u32,
    /// Column index (0-based).
    pub col: u32,
}

impl CellAddress {
    /// Creates a new address.
    #[inline]
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Returns the canonical address key, `"row,col"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }

    /// Parses an address from its canonical key.
    pub fn from_key(key: &str) -> Result<Self, StoreError> {
        key.parse()
    }
}

impl From<(u32, u32)> for CellAddress {
    fn from((row, col): (u32, u32)) -> Self {
        Self::new(row, col)
    }
}

impl From<CellAddress> for String {
    fn from(address: CellAddress) -> Self {
        address.key()
    }
}

impl TryFrom<String> for CellAddress {
    type Error = StoreError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        key.parse()
    }
}

impl FromStr for CellAddress {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidAddressKey { key: s.to_string() };
        let (row, col) = s.split_once(',').ok_or_else(invalid)?;
        let row = row.trim().parse().map_err(|_| invalid())?;
        let col = col.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(row, col))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), u64::from(self.row) + 1)
    }
}

/// Converts a 0-based column index to spreadsheet letters: 0=A, 25=Z, 26=AA.
fn col_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
