//! Cell store trait definition.

use crate::address::CellAddress;
use crate::error::StoreResult;
use crate::value::CellValue;
use std::collections::BTreeMap;

/// The system of record that batches mutate.
///
/// A cell store is a plain map from addresses to values. gridtx owns all
/// batching, rollback, and history logic; stores only read and write.
///
/// # Invariants
///
/// - `get` after `set(a, v)` returns `Some(v)` immediately (read-after-write)
/// - `get` after `delete(a)` returns `None`
/// - `delete` of an empty cell succeeds
/// - Stores must be `Send + Sync` so they can be shared with the embedding app
///
/// # Implementors
///
/// - [`super::InMemoryCellStore`] - Shared in-memory map
pub trait CellStore: Send + Sync {
    /// Reads the value at `address`, or `None` if the cell is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, address: CellAddress) -> StoreResult<Option<CellValue>>;

    /// Writes `value` at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set(&mut self, address: CellAddress, value: CellValue) -> StoreResult<()>;

    /// Removes any value at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    fn delete(&mut self, address: CellAddress) -> StoreResult<()>;

    /// Returns every non-empty cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_all(&self) -> StoreResult<BTreeMap<CellAddress, CellValue>>;

    /// Writes `value` if present, deletes the cell otherwise.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `set` or `delete` error.
    fn put(&mut self, address: CellAddress, value: Option<CellValue>) -> StoreResult<()> {
        match value {
            Some(value) => self.set(address, value),
            None => self.delete(address),
        }
    }
}

impl<S: CellStore + ?Sized> CellStore for Box<S> {
    fn get(&self, address: CellAddress) -> StoreResult<Option<CellValue>> {
        (**self).get(address)
    }

    fn set(&mut self, address: CellAddress, value: CellValue) -> StoreResult<()> {
        (**self).set(address, value)
    }

    fn delete(&mut self, address: CellAddress) -> StoreResult<()> {
        (**self).delete(address)
    }

    fn get_all(&self) -> StoreResult<BTreeMap<CellAddress, CellValue>> {
        (**self).get_all()
    }
}
