//! Batch processor.

use crate::batch::context::{BatchContext, BatchState, BatchStatus};
use crate::change::ChangeSet;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::operation::BulkOperation;
use crate::result::{BatchOperationResult, BatchPreview, OperationResult};
use crate::stats::{ProcessorStats, StatsSnapshot};
use crate::types::BatchId;
use gridtx_store::{CellAddress, CellStore, CellValue};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Applies groups of operations to a cell store atomically.
///
/// The processor provides:
/// - Conflict and limit checks when operations are added, before any store access
/// - Capture of original values before the first write of a commit
/// - Strictly sequential execution in registration order
/// - Rollback of every captured cell when an operation fails
///
/// ## Handles
///
/// Batches are addressed by [`BatchId`]. The processor owns every
/// [`BatchContext`]; terminal contexts stay queryable until [`cleanup`]
/// removes them.
///
/// ## Concurrency
///
/// All methods take `&mut self` and run synchronously. Rollback fidelity
/// assumes no other writer touches the batch's cells between capture and
/// commit or rollback.
///
/// [`cleanup`]: BatchProcessor::cleanup
pub struct BatchProcessor<S: CellStore> {
    /// The system of record.
    store: S,
    config: BatchConfig,
    /// Live and terminal contexts.
    contexts: HashMap<BatchId, BatchContext>,
    next_batch_id: u64,
    stats: ProcessorStats,
}

impl<S: CellStore> BatchProcessor<S> {
    /// Creates a processor with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, BatchConfig::default())
    }

    /// Creates a processor with `config`.
    pub fn with_config(store: S, config: BatchConfig) -> Self {
        if config.enable_parallel_processing {
            debug!(
                worker_threads = config.worker_threads,
                "parallel processing requested; operations still run sequentially"
            );
        }
        Self {
            store,
            config,
            contexts: HashMap::new(),
            next_batch_id: 1,
            stats: ProcessorStats::new(),
        }
    }

    /// Returns the cell store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cell store mutably, e.g. to run undo/redo against it.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the processor, returning the cell store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns a snapshot of the processor counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Begins a new open batch.
    pub fn begin_batch(&mut self, metadata: BTreeMap<String, String>) -> BatchId {
        let id = BatchId::new(self.next_batch_id);
        self.next_batch_id += 1;
        self.contexts.insert(id, BatchContext::new(id, metadata));
        self.stats.record_batch_start();
        debug!(batch_id = %id, "batch begun");
        id
    }

    /// Returns the context for `id`, if tracked.
    #[must_use]
    pub fn context(&self, id: BatchId) -> Option<&BatchContext> {
        self.contexts.get(&id)
    }

    fn context_mut(&mut self, id: BatchId) -> BatchResult<&mut BatchContext> {
        self.contexts
            .get_mut(&id)
            .ok_or(BatchError::BatchNotFound { batch_id: id })
    }

    /// Registers `operation` in an open batch.
    ///
    /// # Errors
    ///
    /// Fails fast, without touching the store, with `BatchNotFound`,
    /// `InactiveBatch`, `SizeLimitExceeded`, `CellConflict` (naming the first
    /// shared cell), or `CellLimitExceeded`, checked in that order.
    pub fn add_operation(&mut self, id: BatchId, operation: BulkOperation) -> BatchResult<()> {
        let max_operations = self.config.max_operations_per_batch;
        let max_cells = self.config.max_cells_per_batch;
        let description = operation.description();
        let ctx = self.context_mut(id)?;
        ctx.push_operation(operation, max_operations, max_cells)?;
        debug!(
            batch_id = %id,
            index = ctx.operations().len() - 1,
            affected = ctx.affected_count(),
            "{description}"
        );
        Ok(())
    }

    /// Lists problems that would stop the batch from committing.
    ///
    /// Nothing is modified. An empty list means the batch is ready.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound` for an unknown id.
    pub fn validate_batch(&self, id: BatchId) -> BatchResult<Vec<String>> {
        let ctx = self
            .contexts
            .get(&id)
            .ok_or(BatchError::BatchNotFound { batch_id: id })?;
        Ok(validation_problems(ctx, &self.config))
    }

    /// Previews every operation of an open batch against the current store.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound`, `InactiveBatch`, or a store read error.
    pub fn preview_batch(&self, id: BatchId, limit: Option<usize>) -> BatchResult<BatchPreview> {
        let ctx = self
            .contexts
            .get(&id)
            .ok_or(BatchError::BatchNotFound { batch_id: id })?;
        ctx.ensure_active()?;

        let operation_previews = ctx
            .operations()
            .iter()
            .map(|op| op.preview(&self.store, limit))
            .collect::<BatchResult<Vec<_>>>()?;

        Ok(BatchPreview {
            batch_id: id,
            total_cells_modified: operation_previews.iter().map(|p| p.cells_modified).sum(),
            total_cells_skipped: operation_previews.iter().map(|p| p.cells_skipped).sum(),
            estimated_time: operation_previews.iter().map(|p| p.estimated_time).sum(),
            operation_previews,
            validation_errors: validation_problems(ctx, &self.config),
        })
    }

    /// Commits a batch.
    ///
    /// 1. Validates first when `validate_before_execution` is set; problems
    ///    produce a failed result and leave the batch open.
    /// 2. Captures the original value of every affected cell.
    /// 3. Executes operations in registration order.
    /// 4. On the first failure with `auto_rollback_on_error`, restores every
    ///    captured cell and returns a rolled-back result. Without it, only the
    ///    failed operation's cells are restored and execution continues.
    /// 5. Consolidates the changes of successful operations.
    ///
    /// Operation failures never escape as errors; they are reported in the
    /// returned result.
    ///
    /// # Errors
    ///
    /// `BatchNotFound` and `InactiveBatch` are returned before any store
    /// access. `RollbackFailed` means the store could not be restored and may
    /// be inconsistent.
    pub fn commit_batch(&mut self, id: BatchId) -> BatchResult<BatchOperationResult> {
        let started = Instant::now();
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(BatchError::BatchNotFound { batch_id: id })?;
        ctx.ensure_active()?;
        let operation_count = ctx.operations().len();

        if self.config.validate_before_execution {
            let problems = validation_problems(ctx, &self.config);
            if !problems.is_empty() {
                warn!(batch_id = %id, problems = problems.len(), "batch failed validation");
                return Ok(BatchOperationResult::rejected(id, operation_count, problems));
            }
        }

        if let Err(err) = ctx.capture_originals(&self.store) {
            let cause = format!("critical batch error: {err}");
            error!(batch_id = %id, "{cause}");
            roll_back(ctx, &mut self.store, &self.stats)?;
            let mut result = BatchOperationResult::rejected(id, operation_count, vec![cause]);
            result.was_rolled_back = true;
            result.total_execution_time = started.elapsed();
            return Ok(result);
        }

        let auto_rollback = self.config.auto_rollback_on_error;
        let mut operation_results = Vec::with_capacity(operation_count);
        let mut batch_errors = Vec::new();
        let mut needs_rollback = false;
        let mut partial_restore: BatchResult<()> = Ok(());

        for (index, operation) in ctx.operations().iter().enumerate() {
            let (result, cause) = match operation.execute(&mut self.store) {
                Ok(result) if result.success => (result, None),
                Ok(result) => {
                    let cause = if result.errors.is_empty() {
                        "reported failure".to_string()
                    } else {
                        result.errors.join("; ")
                    };
                    (result, Some(cause))
                }
                Err(err) => {
                    let cause = err.to_string();
                    (
                        OperationResult::failed(operation.kind(), vec![cause.clone()]),
                        Some(cause),
                    )
                }
            };
            self.stats.record_operation(cause.is_none());
            operation_results.push(result);

            let Some(cause) = cause else { continue };
            let failure = BatchError::OperationExecutionFailed {
                index,
                description: operation.description(),
                reason: cause,
            };
            warn!(batch_id = %id, index, "{failure}");
            batch_errors.push(failure.to_string());

            if auto_rollback {
                needs_rollback = true;
                break;
            }

            let originals = ctx.original_values();
            let cells = operation
                .selection()
                .iter()
                .filter_map(|addr| originals.get(&addr).map(|v| (addr, v.clone())));
            if let Err(err) = restore(id, cells, &mut self.store) {
                partial_restore = Err(err);
                break;
            }
        }

        if needs_rollback {
            roll_back(ctx, &mut self.store, &self.stats)?;
            return Ok(BatchOperationResult {
                batch_id: id,
                success: false,
                operation_results,
                operation_count,
                total_cells_modified: 0,
                total_execution_time: started.elapsed(),
                was_rolled_back: true,
                batch_errors,
                consolidated_changes: ChangeSet::new(),
            });
        }

        ctx.mark_committed();
        if let Err(err) = partial_restore {
            self.stats.record_rollback_failure();
            error!(batch_id = %id, "failed operation could not be reverted: {err}");
            return Err(err);
        }

        let mut consolidated_changes = ChangeSet::new();
        let mut total_cells_modified = 0;
        for result in operation_results.iter().filter(|r| r.success) {
            total_cells_modified += result.cells_modified;
            consolidated_changes.extend(
                result
                    .actual_changes
                    .iter()
                    .map(|(addr, change)| (*addr, change.clone())),
            );
        }
        self.stats.record_commit(total_cells_modified);

        let success = batch_errors.is_empty();
        let total_execution_time = started.elapsed();
        if success {
            info!(
                batch_id = %id,
                operations = operation_count,
                cells = total_cells_modified,
                elapsed_ms = total_execution_time.as_millis() as u64,
                "batch committed"
            );
        } else {
            warn!(
                batch_id = %id,
                failed = batch_errors.len(),
                cells = total_cells_modified,
                "batch partially committed"
            );
        }

        Ok(BatchOperationResult {
            batch_id: id,
            success,
            operation_results,
            operation_count,
            total_cells_modified,
            total_execution_time,
            was_rolled_back: false,
            batch_errors,
            consolidated_changes,
        })
    }

    /// Restores every captured original value and closes the batch.
    ///
    /// Empty originals are restored by deleting the cell. The batch ends
    /// `RolledBack` even if a restore fails.
    ///
    /// # Errors
    ///
    /// `BatchNotFound`, `InactiveBatch`, or `RollbackFailed` after every
    /// restore has been attempted.
    pub fn rollback_batch(&mut self, id: BatchId) -> BatchResult<()> {
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(BatchError::BatchNotFound { batch_id: id })?;
        ctx.ensure_active()?;
        roll_back(ctx, &mut self.store, &self.stats)
    }

    /// Abandons an open batch without touching the store.
    ///
    /// # Errors
    ///
    /// `BatchNotFound` or `InactiveBatch`.
    pub fn cancel_batch(&mut self, id: BatchId) -> BatchResult<()> {
        let ctx = self.context_mut(id)?;
        ctx.ensure_active()?;
        ctx.mark_cancelled();
        self.stats.record_cancel();
        debug!(batch_id = %id, "batch cancelled");
        Ok(())
    }

    /// Discards every terminal context. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|_, ctx| ctx.is_active());
        let removed = before - self.contexts.len();
        if removed > 0 {
            debug!(removed, remaining = self.contexts.len(), "cleaned up batches");
        }
        removed
    }

    /// Runs one operation in its own batch and returns its result.
    ///
    /// If the operation never ran (e.g. it failed validation), a zero-effect
    /// failed result carrying the batch errors is returned instead. The
    /// temporary batch is discarded either way.
    ///
    /// # Errors
    ///
    /// Limit errors from registration and `RollbackFailed` from the commit.
    pub fn execute_single(&mut self, operation: BulkOperation) -> BatchResult<OperationResult> {
        let kind = operation.kind();
        let id = self.begin_batch(BTreeMap::new());
        let outcome = self
            .add_operation(id, operation)
            .and_then(|()| self.commit_batch(id));
        self.contexts.remove(&id);

        let mut batch = outcome?;
        if batch.operation_results.is_empty() {
            return Ok(OperationResult::failed(kind, batch.batch_errors));
        }
        Ok(batch.operation_results.swap_remove(0))
    }

    /// Summary of batch `id`, if tracked.
    #[must_use]
    pub fn batch_status(&self, id: BatchId) -> Option<BatchStatus> {
        self.contexts.get(&id).map(BatchContext::status)
    }

    /// IDs of all open batches, ascending.
    #[must_use]
    pub fn active_batches(&self) -> Vec<BatchId> {
        let mut ids: Vec<_> = self
            .contexts
            .values()
            .filter(|ctx| ctx.is_active())
            .map(BatchContext::id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl<S: CellStore> std::fmt::Debug for BatchProcessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("config", &self.config)
            .field("tracked_batches", &self.contexts.len())
            .field("active_batches", &self.active_batches().len())
            .finish_non_exhaustive()
    }
}

fn validation_problems(ctx: &BatchContext, config: &BatchConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if !ctx.is_active() {
        problems.push(format!("batch is not active (state: {})", ctx.state()));
    }
    if ctx.operations().is_empty() {
        problems.push("batch has no operations".to_string());
    }
    let elapsed = ctx.elapsed();
    if elapsed > config.batch_timeout {
        problems.push(format!(
            "batch timed out: open for {} ms, limit {} ms",
            elapsed.as_millis(),
            config.batch_timeout.as_millis()
        ));
    }
    for (index, operation) in ctx.operations().iter().enumerate() {
        if let Some(message) = operation.validate() {
            problems.push(format!("operation {index}: {message}"));
        }
    }
    problems
}

/// Restores all captured originals and marks the context rolled back.
fn roll_back(
    ctx: &mut BatchContext,
    store: &mut dyn CellStore,
    stats: &ProcessorStats,
) -> BatchResult<()> {
    let id = ctx.id();
    let started = Instant::now();
    let originals = ctx
        .original_values()
        .iter()
        .map(|(addr, value)| (*addr, value.clone()));
    let outcome = restore(id, originals, store);
    ctx.mark_rolled_back();
    stats.record_rollback();

    match outcome {
        Ok(restored) => {
            warn!(
                batch_id = %id,
                restored,
                elapsed_us = elapsed_micros(started.elapsed()),
                "batch rolled back"
            );
            Ok(())
        }
        Err(err) => {
            stats.record_rollback_failure();
            error!(batch_id = %id, "{err}; cell store may be inconsistent");
            Err(err)
        }
    }
}

/// Writes each original back, attempting every cell even after a failure.
fn restore(
    batch_id: BatchId,
    originals: impl Iterator<Item = (CellAddress, Option<CellValue>)>,
    store: &mut dyn CellStore,
) -> BatchResult<usize> {
    let mut originals: Vec<_> = originals.collect();
    originals.sort_unstable_by_key(|(addr, _)| *addr);

    let mut restored = 0;
    let mut failed_cells = Vec::new();
    let mut reason = None;
    for (address, value) in originals {
        match store.put(address, value) {
            Ok(()) => restored += 1,
            Err(err) => {
                reason.get_or_insert_with(|| err.to_string());
                failed_cells.push(address);
            }
        }
    }

    match reason {
        None => Ok(restored),
        Some(reason) => Err(BatchError::RollbackFailed {
            batch_id,
            failed_cells,
            reason,
        }),
    }
}

fn elapsed_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::SetValueOptions;
    use crate::selection::Selection;
    use gridtx_store::{InMemoryCellStore, StoreError, StoreResult};
    use std::ops::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn a(row: u32, col: u32) -> CellAddress {
        CellAddress::new(row, col)
    }

    /// In-memory store that rejects the writes whose 0-based sequence number
    /// falls in `failing_writes`, optionally rejects reads, and counts every
    /// access.
    #[derive(Debug, Clone, Default)]
    struct FlakyStore {
        inner: InMemoryCellStore,
        failing_writes: Range<usize>,
        failing_reads: bool,
        writes: Arc<AtomicUsize>,
        reads: Arc<AtomicUsize>,
    }

    impl FlakyStore {
        fn failing_writes(inner: InMemoryCellStore, failing_writes: Range<usize>) -> Self {
            Self {
                inner,
                failing_writes,
                ..Self::default()
            }
        }

        fn accesses(&self) -> usize {
            self.writes.load(Ordering::SeqCst) + self.reads.load(Ordering::SeqCst)
        }

        fn check_write(&self, address: CellAddress) -> StoreResult<()> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.failing_writes.contains(&n) {
                return Err(StoreError::write_rejected(address, "injected"));
            }
            Ok(())
        }
    }

    impl CellStore for FlakyStore {
        fn get(&self, address: CellAddress) -> StoreResult<Option<CellValue>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.failing_reads {
                return Err(StoreError::read_failed(address, "injected"));
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

    fn initial_diagonal() -> InMemoryCellStore {
        InMemoryCellStore::with_cells((0..3).map(|i| (a(i, i), CellValue::text("initial"))))
    }

    fn diagonal() -> Selection {
        (0..3).map(|i| a(i, i)).collect()
    }

    fn set_op(selection: Selection, value: &str) -> BulkOperation {
        BulkOperation::set_value(
            selection,
            SetValueOptions::new(CellValue::text(value)).overwrite_existing(true),
        )
        .unwrap()
    }

    #[test]
    fn begin_creates_open_batch() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        assert_eq!(bp.active_batches(), vec![id]);
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::Open);
    }

    #[test]
    fn batch_ids_increase() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let first = bp.begin_batch(BTreeMap::new());
        let second = bp.begin_batch(BTreeMap::new());
        assert!(second > first);
        assert_eq!(bp.active_batches(), vec![first, second]);
    }

    #[test]
    fn commit_sets_every_cell() {
        let store = initial_diagonal();
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(diagonal(), "batch test"))
            .unwrap();

        let result = bp.commit_batch(id).unwrap();

        assert!(result.success);
        assert!(!result.was_rolled_back);
        assert_eq!(result.total_cells_modified, 3);
        assert_eq!(result.consolidated_changes.len(), 3);
        let change = result.change_at_key("0,0").unwrap();
        assert_eq!(change.before(), Some(&CellValue::text("initial")));
        assert_eq!(change.after(), Some(&CellValue::text("batch test")));
        assert_eq!(store.value(a(2, 2)), Some(CellValue::text("batch test")));
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::Committed);
    }

    #[test]
    fn failing_write_rolls_back_every_cell() {
        let inner = initial_diagonal();
        let before = inner.snapshot();
        let mut bp = BatchProcessor::new(FlakyStore::failing_writes(inner.clone(), 1..2));
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(diagonal(), "batch test"))
            .unwrap();

        let result = bp.commit_batch(id).unwrap();

        assert!(!result.success);
        assert!(result.was_rolled_back);
        assert_eq!(result.total_cells_modified, 0);
        assert!(result.consolidated_changes.is_empty());
        assert_eq!(result.batch_errors.len(), 1);
        assert!(result.batch_errors[0].starts_with("operation 0 (Set \"batch test\" in 3 cell(s)) failed:"));
        assert_eq!(inner.snapshot(), before);
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::RolledBack);
        assert_eq!(bp.stats().batches_rolled_back, 1);
    }

    #[test]
    fn failure_rolls_back_earlier_operations() {
        let inner = InMemoryCellStore::new();
        // Operation 0 writes twice; the first write of operation 1 fails.
        let mut bp = BatchProcessor::new(FlakyStore::failing_writes(inner.clone(), 2..3));
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::range(a(0, 0), a(0, 1)), "first"))
            .unwrap();
        bp.add_operation(id, set_op(Selection::single(a(5, 5)), "second"))
            .unwrap();

        let result = bp.commit_batch(id).unwrap();

        assert!(result.was_rolled_back);
        assert_eq!(result.operation_results.len(), 2);
        assert!(result.operation_results[0].success);
        assert!(!result.operation_results[1].success);
        assert!(result.batch_errors[0].starts_with("operation 1 "));
        assert!(inner.is_empty());
    }

    #[test]
    fn rollback_failure_is_fatal() {
        let inner = initial_diagonal();
        let mut bp =
            BatchProcessor::new(FlakyStore::failing_writes(inner.clone(), 1..usize::MAX));
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(diagonal(), "batch test"))
            .unwrap();

        let err = bp.commit_batch(id).unwrap_err();

        assert!(err.is_fatal());
        match err {
            BatchError::RollbackFailed {
                batch_id,
                failed_cells,
                ..
            } => {
                assert_eq!(batch_id, id);
                assert_eq!(failed_cells, vec![a(0, 0), a(1, 1), a(2, 2)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::RolledBack);
        assert_eq!(bp.stats().rollback_failures, 1);
    }

    #[test]
    fn partial_commit_restores_only_failed_operation() {
        let inner = initial_diagonal();
        let config = BatchConfig::new().auto_rollback_on_error(false);
        // Operation 0 writes (0,0); operation 1 fails on (1,1); operation 2
        // still runs against (2,2).
        let store = FlakyStore::failing_writes(inner.clone(), 1..2);
        let mut bp = BatchProcessor::with_config(store, config);
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "a"))
            .unwrap();
        bp.add_operation(id, set_op(Selection::single(a(1, 1)), "b"))
            .unwrap();
        bp.add_operation(id, set_op(Selection::single(a(2, 2)), "c"))
            .unwrap();

        let result = bp.commit_batch(id).unwrap();

        assert!(!result.success);
        assert!(!result.was_rolled_back);
        assert_eq!(result.operation_results.len(), 3);
        assert_eq!(result.total_cells_modified, 2);
        assert_eq!(result.batch_errors.len(), 1);
        assert!(result.change_at_key("1,1").is_none());
        assert_eq!(inner.value(a(0, 0)), Some(CellValue::text("a")));
        assert_eq!(inner.value(a(1, 1)), Some(CellValue::text("initial")));
        assert_eq!(inner.value(a(2, 2)), Some(CellValue::text("c")));
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::Committed);
    }

    #[test]
    fn partial_commit_stops_when_failed_operation_cannot_be_reverted() {
        let inner = initial_diagonal();
        let config = BatchConfig::new().auto_rollback_on_error(false);
        // Write 1 is operation 1 on (1,1), write 2 is its restore.
        let store = FlakyStore::failing_writes(inner.clone(), 1..3);
        let mut bp = BatchProcessor::with_config(store, config);
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "a"))
            .unwrap();
        bp.add_operation(id, set_op(Selection::single(a(1, 1)), "b"))
            .unwrap();
        bp.add_operation(id, set_op(Selection::single(a(2, 2)), "c"))
            .unwrap();

        let err = bp.commit_batch(id).unwrap_err();

        let BatchError::RollbackFailed {
            batch_id,
            failed_cells,
            ..
        } = err
        else {
            panic!("expected rollback failure");
        };
        assert_eq!(batch_id, id);
        assert_eq!(failed_cells, vec![a(1, 1)]);
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::Committed);
        assert_eq!(bp.stats().rollback_failures, 1);
        assert_eq!(inner.value(a(0, 0)), Some(CellValue::text("a")));
        // Operation 2 never ran
        assert_eq!(inner.value(a(2, 2)), Some(CellValue::text("initial")));
        assert!(matches!(
            bp.commit_batch(id),
            Err(BatchError::InactiveBatch { .. })
        ));
    }

    #[test]
    fn capture_failure_is_critical() {
        let store = FlakyStore {
            failing_reads: true,
            ..FlakyStore::default()
        };
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "x"))
            .unwrap();

        let result = bp.commit_batch(id).unwrap();

        assert!(!result.success);
        assert!(result.was_rolled_back);
        assert!(result.operation_results.is_empty());
        assert!(result.batch_errors[0].starts_with("critical batch error"));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::RolledBack);
    }

    #[test]
    fn add_to_unknown_batch_fails() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let err = bp
            .add_operation(BatchId::new(99), set_op(Selection::single(a(0, 0)), "x"))
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::BatchNotFound {
                batch_id: BatchId::new(99)
            }
        );
    }

    #[test]
    fn conflict_rejected_at_add_time() {
        let store = FlakyStore::default();
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::range(a(0, 0), a(1, 1)), "x"))
            .unwrap();

        let err = bp
            .add_operation(id, set_op(Selection::range(a(1, 1), a(2, 2)), "y"))
            .unwrap_err();

        assert!(matches!(err, BatchError::CellConflict { address, .. } if address == a(1, 1)));
        assert_eq!(bp.context(id).unwrap().operations().len(), 1);
        assert_eq!(store.accesses(), 0);
    }

    #[test]
    fn validate_reports_problems_without_mutation() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        assert_eq!(
            bp.validate_batch(id).unwrap(),
            vec!["batch has no operations".to_string()]
        );

        bp.add_operation(id, BulkOperation::clear(Selection::empty()))
            .unwrap();
        let problems = bp.validate_batch(id).unwrap();
        assert_eq!(problems, vec!["operation 0: empty selection".to_string()]);
        assert!(bp.context(id).unwrap().is_active());
    }

    #[test]
    fn validate_reports_timeout() {
        let config = BatchConfig::new().batch_timeout(Duration::from_millis(1));
        let mut bp = BatchProcessor::with_config(InMemoryCellStore::new(), config);
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "x"))
            .unwrap();
        std::thread::sleep(Duration::from_millis(10));

        let problems = bp.validate_batch(id).unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("batch timed out"));
    }

    #[test]
    fn commit_with_validation_failure_executes_nothing() {
        let store = FlakyStore::default();
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());

        let result = bp.commit_batch(id).unwrap();

        assert!(!result.success);
        assert!(!result.was_rolled_back);
        assert!(result.operation_results.is_empty());
        assert_eq!(
            result.batch_errors,
            vec!["batch has no operations".to_string()]
        );
        assert_eq!(store.accesses(), 0);
        // Still open: the caller can add work and retry
        assert!(bp.context(id).unwrap().is_active());
    }

    #[test]
    fn empty_batch_commits_without_validation() {
        let config = BatchConfig::new().validate_before_execution(false);
        let mut bp = BatchProcessor::with_config(InMemoryCellStore::new(), config);
        let id = bp.begin_batch(BTreeMap::new());

        let result = bp.commit_batch(id).unwrap();
        assert!(result.success);
        assert_eq!(result.operation_count, 0);
        assert!(!bp.context(id).unwrap().is_active());
    }

    #[test]
    fn second_commit_is_inactive_and_touches_nothing() {
        let store = FlakyStore::default();
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "x"))
            .unwrap();
        bp.commit_batch(id).unwrap();
        let accesses = store.accesses();

        let err = bp.commit_batch(id).unwrap_err();
        assert!(matches!(
            err,
            BatchError::InactiveBatch {
                state: BatchState::Committed,
                ..
            }
        ));
        assert_eq!(store.accesses(), accesses);
    }

    #[test]
    fn cancel_twice_fails() {
        let store = FlakyStore::default();
        let mut bp = BatchProcessor::new(store.clone());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::single(a(0, 0)), "x"))
            .unwrap();

        bp.cancel_batch(id).unwrap();
        let err = bp.cancel_batch(id).unwrap_err();

        assert!(matches!(
            err,
            BatchError::InactiveBatch {
                state: BatchState::Cancelled,
                ..
            }
        ));
        assert_eq!(store.accesses(), 0);
        assert_eq!(bp.stats().batches_cancelled, 1);
    }

    #[test]
    fn add_after_cancel_fails() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        bp.cancel_batch(id).unwrap();
        let err = bp
            .add_operation(id, set_op(Selection::single(a(0, 0)), "x"))
            .unwrap_err();
        assert!(matches!(err, BatchError::InactiveBatch { .. }));
    }

    #[test]
    fn preview_batch_rejects_terminal_batch() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::range(a(0, 0), a(0, 4)), "x"))
            .unwrap();

        let preview = bp.preview_batch(id, Some(2)).unwrap();
        assert_eq!(preview.total_cells_modified, 5);
        assert_eq!(preview.operation_previews[0].preview_count, 2);
        assert!(preview.is_clean());

        bp.cancel_batch(id).unwrap();
        assert!(matches!(
            bp.preview_batch(id, None),
            Err(BatchError::InactiveBatch { .. })
        ));
    }

    #[test]
    fn rollback_open_batch_marks_terminal() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        bp.rollback_batch(id).unwrap();
        assert_eq!(bp.batch_status(id).unwrap().state, BatchState::RolledBack);
        assert!(bp.rollback_batch(id).is_err());
    }

    #[test]
    fn cleanup_removes_terminal_contexts() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let done = bp.begin_batch(BTreeMap::new());
        let open = bp.begin_batch(BTreeMap::new());
        bp.cancel_batch(done).unwrap();

        assert_eq!(bp.cleanup(), 1);
        assert!(bp.batch_status(done).is_none());
        assert!(bp.batch_status(open).is_some());
        assert_eq!(bp.cleanup(), 0);
    }

    #[test]
    fn execute_single_returns_operation_result() {
        let store = InMemoryCellStore::new();
        let mut bp = BatchProcessor::new(store.clone());

        let result = bp
            .execute_single(set_op(Selection::range(a(0, 0), a(0, 1)), "solo"))
            .unwrap();

        assert!(result.success);
        assert_eq!(result.cells_modified, 2);
        assert_eq!(store.len(), 2);
        assert!(bp.active_batches().is_empty());
        assert!(bp.batch_status(BatchId::new(1)).is_none());
    }

    #[test]
    fn execute_single_synthesizes_failure_when_nothing_ran() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let result = bp
            .execute_single(BulkOperation::clear(Selection::empty()))
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.cells_modified, 0);
        assert_eq!(
            result.errors,
            vec!["operation 0: empty selection".to_string()]
        );
    }

    #[test]
    fn execute_single_propagates_limit_errors() {
        let config = BatchConfig::new().max_cells_per_batch(1);
        let mut bp = BatchProcessor::with_config(InMemoryCellStore::new(), config);
        let err = bp
            .execute_single(set_op(Selection::range(a(0, 0), a(0, 1)), "x"))
            .unwrap_err();
        assert!(matches!(err, BatchError::CellLimitExceeded { .. }));
        assert!(bp.active_batches().is_empty());
    }

    #[test]
    fn stats_track_lifecycle() {
        let mut bp = BatchProcessor::new(InMemoryCellStore::new());
        let id = bp.begin_batch(BTreeMap::new());
        bp.add_operation(id, set_op(Selection::range(a(0, 0), a(0, 2)), "x"))
            .unwrap();
        bp.commit_batch(id).unwrap();

        let stats = bp.stats();
        assert_eq!(stats.batches_started, 1);
        assert_eq!(stats.batches_committed, 1);
        assert_eq!(stats.operations_executed, 1);
        assert_eq!(stats.cells_modified, 3);
    }
}
