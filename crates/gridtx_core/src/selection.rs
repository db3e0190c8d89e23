//! Immutable cell selections.

use gridtx_store::CellAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An immutable set of cell addresses that an operation targets.
///
/// Iteration is row-major, so conflict reports and previews are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    cells: BTreeSet<CellAddress>,
}

impl Selection {
    /// Creates an empty selection.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a selection of one cell.
    #[must_use]
    pub fn single(address: CellAddress) -> Self {
        Self {
            cells: BTreeSet::from([address]),
        }
    }

    /// Creates a rectangular selection spanning both corners (inclusive).
    ///
    /// Corners may be given in any order.
    #[must_use]
    pub fn range(a: CellAddress, b: CellAddress) -> Self {
        let (r0, r1) = (a.row.min(b.row), a.row.max(b.row));
        let (c0, c1) = (a.col.min(b.col), a.col.max(b.col));
        let cells = (r0..=r1)
            .flat_map(|row| (c0..=c1).map(move |col| CellAddress::new(row, col)))
            .collect();
        Self { cells }
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the selection has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns true if `address` is selected.
    #[must_use]
    pub fn contains(&self, address: CellAddress) -> bool {
        self.cells.contains(&address)
    }

    /// Iterates the cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.cells.iter().copied()
    }

    /// Returns a selection containing the cells of both.
    #[must_use]
    pub fn union(&self, other: &Selection) -> Selection {
        Self {
            cells: self.cells.union(&other.cells).copied().collect(),
        }
    }
}

impl FromIterator<CellAddress> for Selection {
    fn from_iter<I: IntoIterator<Item = CellAddress>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = CellAddress;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, CellAddress>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter().copied()
    }
}
