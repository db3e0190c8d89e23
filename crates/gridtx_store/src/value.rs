//! Cell values.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal or formula value held by a cell.
///
/// Values are `Eq + Hash` (numbers compare through [`OrderedFloat`]) so change
/// sets can be grouped by value. An empty cell is represented by the absence
/// of a value (`Option::None`), not by a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellValue {
    /// Plain text.
    Text(String),
    /// A number.
    Number(OrderedFloat<f64>),
    /// A boolean.
    Boolean(bool),
    /// Formula source, stored without the leading `=`.
    Formula(String),
}

impl CellValue {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Creates a number value.
    #[must_use]
    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    /// Creates a formula value. A single leading `=` is stripped.
    pub fn formula(source: impl Into<String>) -> Self {
        let source = source.into();
        match source.strip_prefix('=') {
            Some(body) => Self::Formula(body.to_string()),
            None => Self::Formula(source),
        }
    }

    /// Returns true for formula values.
    #[must_use]
    pub fn is_formula(&self) -> bool {
        matches!(self, Self::Formula(_))
    }

    /// Returns the formula text including the leading `=`, if this is a formula.
    #[must_use]
    pub fn formula_text(&self) -> Option<String> {
        match self {
            Self::Formula(body) => Some(format!("={body}")),
            _ => None,
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.into_inner()),
            _ => None,
        }
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n.into_inner()),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Formula(body) => write!(f, "={body}"),
        }
    }
}
