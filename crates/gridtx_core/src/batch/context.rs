//! Batch context state.

use crate::error::{BatchError, BatchResult};
use crate::operation::BulkOperation;
use crate::types::BatchId;
use gridtx_store::{CellAddress, CellStore, CellValue, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle state of a batch.
///
/// `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchState {
    /// Accepting operations.
    Open,
    /// Operations were executed and their changes kept.
    Committed,
    /// Original values were restored.
    RolledBack,
    /// Abandoned before commit; the store was never touched.
    Cancelled,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One in-flight batch.
///
/// Contexts are owned by the [`super::BatchProcessor`] and only change
/// through its methods. Once a context leaves `Open` its operations and
/// affected cells are frozen.
#[derive(Debug)]
pub struct BatchContext {
    id: BatchId,
    operations: Vec<BulkOperation>,
    /// Affected cell -> index of the operation that owns it.
    affected: HashMap<CellAddress, usize>,
    /// Values captured before the first write; `None` means the cell was empty.
    original_values: HashMap<CellAddress, Option<CellValue>>,
    started_at: Instant,
    state: BatchState,
    metadata: BTreeMap<String, String>,
}

impl BatchContext {
    pub(crate) fn new(id: BatchId, metadata: BTreeMap<String, String>) -> Self {
        Self {
            id,
            operations: Vec::new(),
            affected: HashMap::new(),
            original_values: HashMap::new(),
            started_at: Instant::now(),
            state: BatchState::Open,
            metadata,
        }
    }

    /// Returns the batch ID.
    #[must_use]
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Checks if the batch still accepts operations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == BatchState::Open
    }

    /// Registered operations, in execution order.
    #[must_use]
    pub fn operations(&self) -> &[BulkOperation] {
        &self.operations
    }

    /// Number of distinct cells targeted by the batch.
    #[must_use]
    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }

    /// Returns true if some operation in the batch targets `address`.
    #[must_use]
    pub fn is_affected(&self, address: CellAddress) -> bool {
        self.affected.contains_key(&address)
    }

    /// Iterates the targeted cells (unordered).
    pub fn affected_cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.affected.keys().copied()
    }

    /// Index of the operation that targets `address`.
    #[must_use]
    pub fn owner_of(&self, address: CellAddress) -> Option<usize> {
        self.affected.get(&address).copied()
    }

    /// Values captured for rollback so far.
    #[must_use]
    pub fn original_values(&self) -> &HashMap<CellAddress, Option<CellValue>> {
        &self.original_values
    }

    /// Time since the batch was begun.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Caller-supplied metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Ensures the batch is open.
    pub(crate) fn ensure_active(&self) -> BatchResult<()> {
        match self.state {
            BatchState::Open => Ok(()),
            state => Err(BatchError::InactiveBatch {
                batch_id: self.id,
                state,
            }),
        }
    }

    /// Checks limits and conflicts, then registers `operation`.
    ///
    /// Nothing is modified unless every check passes.
    pub(crate) fn push_operation(
        &mut self,
        operation: BulkOperation,
        max_operations: usize,
        max_cells: usize,
    ) -> BatchResult<()> {
        self.ensure_active()?;

        if self.operations.len() + 1 > max_operations {
            return Err(BatchError::SizeLimitExceeded {
                limit: max_operations,
            });
        }

        let selection = operation.selection();
        if let Some((address, owner)) = selection
            .iter()
            .find_map(|addr| self.owner_of(addr).map(|owner| (addr, owner)))
        {
            return Err(BatchError::CellConflict {
                address,
                existing_operation: owner,
            });
        }

        let projected = self.affected.len() + selection.count();
        if projected > max_cells {
            return Err(BatchError::CellLimitExceeded {
                limit: max_cells,
                projected,
            });
        }

        let index = self.operations.len();
        self.affected
            .extend(selection.iter().map(|addr| (addr, index)));
        self.operations.push(operation);
        Ok(())
    }

    /// Reads the current value of every affected cell not yet captured.
    ///
    /// Returns the number of newly captured cells. Cells are captured in
    /// row-major order; on a read error the cells captured so far are kept.
    pub(crate) fn capture_originals(&mut self, store: &dyn CellStore) -> StoreResult<usize> {
        let mut pending: Vec<_> = self
            .affected
            .keys()
            .filter(|addr| !self.original_values.contains_key(*addr))
            .copied()
            .collect();
        pending.sort_unstable();

        for &address in &pending {
            let value = store.get(address)?;
            self.original_values.insert(address, value);
        }
        Ok(pending.len())
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = BatchState::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.state = BatchState::RolledBack;
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.state = BatchState::Cancelled;
    }

    /// Point-in-time summary for introspection.
    #[must_use]
    pub fn status(&self) -> BatchStatus {
        BatchStatus {
            batch_id: self.id,
            state: self.state,
            operation_count: self.operations.len(),
            affected_cells: self.affected.len(),
            captured_originals: self.original_values.len(),
            elapsed: self.elapsed(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Summary of a batch returned by `batch_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    /// The batch.
    pub batch_id: BatchId,
    /// Current state.
    pub state: BatchState,
    /// Registered operations.
    pub operation_count: usize,
    /// Distinct targeted cells.
    pub affected_cells: usize,
    /// Cells with a captured original value.
    pub captured_originals: usize,
    /// Time since the batch was begun.
    pub elapsed: Duration,
    /// Caller-supplied metadata.
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use gridtx_store::InMemoryCellStore;

    fn a(row: u32, col: u32) -> CellAddress {
        CellAddress::new(row, col)
    }

    fn create_ctx() -> BatchContext {
        BatchContext::new(BatchId::new(1), BTreeMap::new())
    }

    fn clear(selection: Selection) -> BulkOperation {
        BulkOperation::clear(selection)
    }

    #[test]
    fn new_context_is_open() {
        let ctx = create_ctx();
        assert!(ctx.is_active());
        assert_eq!(ctx.state(), BatchState::Open);
        assert_eq!(ctx.affected_count(), 0);
    }

    #[test]
    fn push_records_ownership() {
        let mut ctx = create_ctx();
        ctx.push_operation(clear(Selection::single(a(0, 0))), 10, 10)
            .unwrap();
        ctx.push_operation(clear(Selection::range(a(1, 0), a(1, 1))), 10, 10)
            .unwrap();

        assert_eq!(ctx.operations().len(), 2);
        assert_eq!(ctx.affected_count(), 3);
        assert_eq!(ctx.owner_of(a(0, 0)), Some(0));
        assert_eq!(ctx.owner_of(a(1, 1)), Some(1));
    }

    #[test]
    fn conflict_names_first_shared_cell() {
        let mut ctx = create_ctx();
        ctx.push_operation(clear(Selection::range(a(0, 1), a(0, 2))), 10, 10)
            .unwrap();

        let err = ctx
            .push_operation(clear(Selection::range(a(0, 0), a(0, 3))), 10, 10)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::CellConflict {
                address: a(0, 1),
                existing_operation: 0
            }
        );
        // Rejected operation left no trace
        assert_eq!(ctx.operations().len(), 1);
        assert!(!ctx.is_affected(a(0, 0)));
    }

    #[test]
    fn size_limit_checked_before_conflict() {
        let mut ctx = create_ctx();
        ctx.push_operation(clear(Selection::single(a(0, 0))), 1, 10)
            .unwrap();
        let err = ctx
            .push_operation(clear(Selection::single(a(0, 0))), 1, 10)
            .unwrap_err();
        assert_eq!(err, BatchError::SizeLimitExceeded { limit: 1 });
    }

    #[test]
    fn cell_limit_uses_projected_total() {
        let mut ctx = create_ctx();
        ctx.push_operation(clear(Selection::range(a(0, 0), a(0, 2))), 10, 4)
            .unwrap();
        let err = ctx
            .push_operation(clear(Selection::range(a(1, 0), a(1, 1))), 10, 4)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::CellLimitExceeded {
                limit: 4,
                projected: 5
            }
        );
    }

    #[test]
    fn cannot_push_after_commit() {
        let mut ctx = create_ctx();
        ctx.mark_committed();
        let err = ctx
            .push_operation(clear(Selection::single(a(0, 0))), 10, 10)
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::InactiveBatch {
                state: BatchState::Committed,
                ..
            }
        ));
    }

    #[test]
    fn capture_is_once_per_cell() {
        let mut store = InMemoryCellStore::with_cells([(a(0, 0), CellValue::text("orig"))]);
        let mut ctx = create_ctx();
        ctx.push_operation(clear(Selection::range(a(0, 0), a(0, 1))), 10, 10)
            .unwrap();

        assert_eq!(ctx.capture_originals(&store).unwrap(), 2);
        store.set(a(0, 0), CellValue::text("changed")).unwrap();
        assert_eq!(ctx.capture_originals(&store).unwrap(), 0);

        assert_eq!(
            ctx.original_values()[&a(0, 0)],
            Some(CellValue::text("orig"))
        );
        assert_eq!(ctx.original_values()[&a(0, 1)], None);
    }

    #[test]
    fn status_summarizes() {
        let mut ctx = BatchContext::new(
            BatchId::new(9),
            BTreeMap::from([("source".to_string(), "paste".to_string())]),
        );
        ctx.push_operation(clear(Selection::single(a(0, 0))), 10, 10)
            .unwrap();
        let status = ctx.status();
        assert_eq!(status.batch_id, BatchId::new(9));
        assert_eq!(status.operation_count, 1);
        assert_eq!(status.affected_cells, 1);
        assert_eq!(status.metadata["source"], "paste");
    }
}
