//! In-memory cell store.

use crate::address::CellAddress;
use crate::error::StoreResult;
use crate::store::CellStore;
use crate::value::CellValue;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An in-memory cell store.
///
/// Clones are handles onto the same map, so the embedding application can
/// keep a handle for reading while a batch processor owns another for
/// writing. This store is suitable for:
/// - Unit and integration tests
/// - Ephemeral sheets that don't need persistence
///
/// # Example
///
/// ```rust
/// use gridtx_store::{CellAddress, CellStore, CellValue, InMemoryCellStore};
///
/// let mut writer = InMemoryCellStore::new();
/// let reader = writer.clone();
/// writer.set(CellAddress::new(1, 1), CellValue::number(4.0)).unwrap();
/// assert_eq!(reader.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCellStore {
    cells: Arc<RwLock<BTreeMap<CellAddress, CellValue>>>,
}

impl InMemoryCellStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `cells`.
    pub fn with_cells(cells: impl IntoIterator<Item = (CellAddress, CellValue)>) -> Self {
        Self {
            cells: Arc::new(RwLock::new(cells.into_iter().collect())),
        }
    }

    /// Returns the value at `address` without going through [`CellStore`].
    #[must_use]
    pub fn value(&self, address: CellAddress) -> Option<CellValue> {
        self.cells.read().get(&address).cloned()
    }

    /// Returns a copy of every non-empty cell.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<CellAddress, CellValue> {
        self.cells.read().clone()
    }

    /// Returns the number of non-empty cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Returns true if no cell holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.cells.write().clear();
    }
}

impl CellStore for InMemoryCellStore {
    fn get(&self, address: CellAddress) -> StoreResult<Option<CellValue>> {
        Ok(self.value(address))
    }

    fn set(&mut self, address: CellAddress, value: CellValue) -> StoreResult<()> {
        self.cells.write().insert(address, value);
        Ok(())
    }

    fn delete(&mut self, address: CellAddress) -> StoreResult<()> {
        self.cells.write().remove(&address);
        Ok(())
    }

    fn get_all(&self) -> StoreResult<BTreeMap<CellAddress, CellValue>> {
        Ok(self.snapshot())
    }
}
