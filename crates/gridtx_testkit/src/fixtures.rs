//! Test fixtures and cell store helpers.
//!
//! Provides a fault-injecting store for rollback tests and convenience
//! builders for common grids and operations.

use gridtx_core::{
    BulkOperation, CellAddress, CellStore, CellValue, InMemoryCellStore, Selection,
    SetValueOptions, StoreError, StoreResult,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Which accesses a [`FaultyCellStore`] rejects.
#[derive(Debug, Clone, Default)]
struct FaultPlan {
    /// 1-based write numbers that fail once each.
    failing_writes: BTreeSet<usize>,
    /// Every write from this 1-based number on fails.
    failing_from: Option<usize>,
    /// Writes to these cells always fail.
    failing_cells: BTreeSet<CellAddress>,
    /// Every read fails.
    failing_reads: bool,
}

/// A cell store that counts accesses and fails on demand.
///
/// Wraps an [`InMemoryCellStore`]; clones share the same cells, counters,
/// and fault plan, so a test can keep a handle while a processor owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct FaultyCellStore {
    inner: InMemoryCellStore,
    plan: Arc<Mutex<FaultPlan>>,
    writes: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl FaultyCellStore {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: InMemoryCellStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Makes the `n`th write (1-based, counted from store creation) fail.
    pub fn fail_on_write(&self, n: usize) -> &Self {
        self.plan.lock().failing_writes.insert(n);
        self
    }

    /// Makes the next write fail.
    pub fn fail_next_write(&self) -> &Self {
        self.fail_on_write(self.write_count() + 1)
    }

    /// Makes every write from the `n`th on fail.
    pub fn fail_writes_from(&self, n: usize) -> &Self {
        self.plan.lock().failing_from = Some(n);
        self
    }

    /// Makes every write to `address` fail.
    pub fn fail_at(&self, address: CellAddress) -> &Self {
        self.plan.lock().failing_cells.insert(address);
        self
    }

    /// Makes every read fail.
    pub fn fail_reads(&self) -> &Self {
        self.plan.lock().failing_reads = true;
        self
    }

    /// Disarms every fault.
    pub fn heal(&self) {
        *self.plan.lock() = FaultPlan::default();
    }

    /// Writes attempted so far, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Reads attempted so far, including failed ones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Reads plus writes attempted so far.
    pub fn access_count(&self) -> usize {
        self.write_count() + self.read_count()
    }

    /// The wrapped store.
    pub fn inner(&self) -> &InMemoryCellStore {
        &self.inner
    }

    /// Copy of every non-empty cell.
    pub fn snapshot(&self) -> BTreeMap<CellAddress, CellValue> {
        self.inner.snapshot()
    }

    fn check_write(&self, address: CellAddress) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        let mut plan = self.plan.lock();
        let injected = plan.failing_writes.remove(&n)
            || plan.failing_from.is_some_and(|from| n >= from)
            || plan.failing_cells.contains(&address);
        if injected {
            return Err(StoreError::write_rejected(
                address,
                format!("injected failure on write {n}"),
            ));
        }
        Ok(())
    }
}

impl CellStore for FaultyCellStore {
    fn get(&self, address: CellAddress) -> StoreResult<Option<CellValue>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.plan.lock().failing_reads {
            return Err(StoreError::read_failed(address, "injected read failure"));
        }
        self.inner.get(address)
    }

    fn set(&mut self, address: CellAddress, value: CellValue) -> StoreResult<()> {
        self.check_write(address)?;
        self.inner.set(address, value)
    }

    fn delete(&mut self, address: CellAddress) -> StoreResult<()> {
        self.check_write(address)?;
        self.inner.delete(address)
    }

    fn get_all(&self) -> StoreResult<BTreeMap<CellAddress, CellValue>> {
        self.inner.get_all()
    }
}

/// Shorthand for [`CellAddress::new`].
pub fn addr(row: u32, col: u32) -> CellAddress {
    CellAddress::new(row, col)
}

/// Builds a store from `((row, col), text)` pairs.
pub fn text_grid(cells: &[((u32, u32), &str)]) -> InMemoryCellStore {
    InMemoryCellStore::with_cells(
        cells
            .iter()
            .map(|&((row, col), text)| (addr(row, col), CellValue::text(text))),
    )
}

/// Builds a `rows` x `cols` store where every cell holds `value(row, col)`.
pub fn filled_grid(
    rows: u32,
    cols: u32,
    value: impl Fn(u32, u32) -> CellValue,
) -> InMemoryCellStore {
    InMemoryCellStore::with_cells(
        (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .map(|(row, col)| (addr(row, col), value(row, col))),
    )
}

/// A set-value operation writing `text` with overwrite on.
///
/// # Panics
///
/// Never for text values.
pub fn overwrite_text(selection: Selection, text: &str) -> BulkOperation {
    BulkOperation::set_value(
        selection,
        SetValueOptions::new(CellValue::text(text)).overwrite_existing(true),
    )
    .expect("text values are always valid")
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// The diagonal `(0,0)`, `(1,1)`, `(2,2)`.
    pub fn diagonal() -> Selection {
        (0..3).map(|i| addr(i, i)).collect()
    }

    /// A store holding `"initial"` on the diagonal.
    pub fn initial_diagonal() -> InMemoryCellStore {
        InMemoryCellStore::with_cells(
            diagonal()
                .iter()
                .map(|a| (a, CellValue::text("initial"))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accesses() {
        let mut store = FaultyCellStore::default();
        store.set(addr(0, 0), CellValue::text("x")).unwrap();
        store.get(addr(0, 0)).unwrap();
        store.delete(addr(0, 0)).unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.access_count(), 3);
    }

    #[test]
    fn nth_write_fails_once() {
        let mut store = FaultyCellStore::default();
        store.fail_on_write(2);
        assert!(store.set(addr(0, 0), CellValue::text("a")).is_ok());
        assert!(store.set(addr(0, 1), CellValue::text("b")).is_err());
        assert!(store.set(addr(0, 1), CellValue::text("b")).is_ok());
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn cell_faults_persist_until_healed() {
        let mut store = FaultyCellStore::default();
        store.fail_at(addr(1, 1));
        assert!(store.set(addr(1, 1), CellValue::text("a")).is_err());
        assert!(store.delete(addr(1, 1)).is_err());
        store.heal();
        assert!(store.set(addr(1, 1), CellValue::text("a")).is_ok());
    }

    #[test]
    fn clones_share_state() {
        let store = FaultyCellStore::new(text_grid(&[((0, 0), "a")]));
        let mut handle = store.clone();
        handle.set(addr(0, 1), CellValue::text("b")).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn filled_grid_covers_rectangle() {
        let store = filled_grid(2, 3, |r, c| CellValue::number(f64::from(r * 10 + c)));
        assert_eq!(store.len(), 6);
        assert_eq!(store.value(addr(1, 2)), Some(CellValue::number(12.0)));
    }

    #[test]
    fn initial_diagonal_scenario() {
        let store = scenarios::initial_diagonal();
        assert_eq!(store.len(), 3);
        assert_eq!(store.value(addr(2, 2)), Some(CellValue::text("initial")));
    }
}
