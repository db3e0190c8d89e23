//! Recorded cell changes.
//!
//! A [`CellChange`] is the only record of what an operation did. Undo and
//! redo are derived from these records alone, never by re-running the logic
//! that produced them.

use gridtx_store::{CellAddress, CellValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-address change records, ordered row-major.
pub type ChangeSet = BTreeMap<CellAddress, CellChange>;

/// Kind of change applied to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// A literal value was written.
    Value,
    /// A formula was written.
    Formula,
    /// Formatting changed. Produced by collaborators, never by this crate.
    Format,
    /// The cell was emptied.
    Clear,
}

/// An immutable before/after record for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    address: CellAddress,
    before: Option<CellValue>,
    after: Option<CellValue>,
    formula: Option<String>,
    is_formula: bool,
    change_type: ChangeType,
    metadata: BTreeMap<String, String>,
}

impl CellChange {
    /// Creates a change record. Formula fields and change type derive from `after`.
    #[must_use]
    pub fn new(address: CellAddress, before: Option<CellValue>, after: Option<CellValue>) -> Self {
        let formula = after.as_ref().and_then(CellValue::formula_text);
        let change_type = match &after {
            None => ChangeType::Clear,
            Some(v) if v.is_formula() => ChangeType::Formula,
            Some(_) => ChangeType::Value,
        };
        Self {
            address,
            before,
            after,
            is_formula: formula.is_some(),
            formula,
            change_type,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns a copy carrying one extra metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The changed cell.
    #[must_use]
    pub fn address(&self) -> CellAddress {
        self.address
    }

    /// Value before the change, `None` if the cell was empty.
    #[must_use]
    pub fn before(&self) -> Option<&CellValue> {
        self.before.as_ref()
    }

    /// Value after the change, `None` if the cell was emptied.
    #[must_use]
    pub fn after(&self) -> Option<&CellValue> {
        self.after.as_ref()
    }

    /// Formula text (with `=`) written by the change, if any.
    #[must_use]
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// Whether the change wrote a formula.
    #[must_use]
    pub fn is_formula(&self) -> bool {
        self.is_formula
    }

    /// Kind of change.
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Free-form metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Returns the change that undoes this one.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self::new(self.address, self.after.clone(), self.before.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_change() {
        let c = CellChange::new(
            CellAddress::new(0, 0),
            Some(CellValue::text("a")),
            Some(CellValue::text("b")),
        );
        assert_eq!(c.change_type(), ChangeType::Value);
        assert!(!c.is_formula());
        assert_eq!(c.formula(), None);
    }

    #[test]
    fn formula_change() {
        let c = CellChange::new(CellAddress::new(0, 0), None, Some(CellValue::formula("=A2*2")));
        assert_eq!(c.change_type(), ChangeType::Formula);
        assert!(c.is_formula());
        assert_eq!(c.formula(), Some("=A2*2"));
    }

    #[test]
    fn clear_change() {
        let c = CellChange::new(CellAddress::new(0, 0), Some(CellValue::number(1.0)), None);
        assert_eq!(c.change_type(), ChangeType::Clear);
    }

    #[test]
    fn inverted_swaps_values() {
        let c = CellChange::new(CellAddress::new(4, 2), None, Some(CellValue::text("x")))
            .with_metadata("source", "paste");
        let inv = c.inverted();
        assert_eq!(inv.before(), Some(&CellValue::text("x")));
        assert_eq!(inv.after(), None);
        assert_eq!(inv.change_type(), ChangeType::Clear);
        assert!(inv.metadata().is_empty());
    }
}
