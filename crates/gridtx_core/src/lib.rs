//! # gridtx Core
//!
//! Transactional batch engine for spreadsheet-style cell stores.
//!
//! This crate provides:
//! - Bulk operations over a [`Selection`] (set value, clear) with previews
//! - Atomic batches: conflict checks at add time, original-value capture,
//!   sequential execution and rollback on failure
//! - Faithful per-cell change records ([`CellChange`])
//! - A bounded undo/redo history derived from those records
//!
//! ## Example
//!
//! ```rust
//! use gridtx_core::{
//!     BatchProcessor, BulkOperation, CellAddress, CellValue, InMemoryCellStore, Selection,
//!     SetValueOptions, UndoRedoManager,
//! };
//! use std::collections::BTreeMap;
//!
//! let store = InMemoryCellStore::new();
//! let mut processor = BatchProcessor::new(store.clone());
//! let mut history = UndoRedoManager::default();
//!
//! let batch = processor.begin_batch(BTreeMap::new());
//! let selection = Selection::range(CellAddress::new(0, 0), CellAddress::new(1, 1));
//! let op = BulkOperation::set_value(selection, SetValueOptions::new(CellValue::text("x")))?;
//! processor.add_operation(batch, op)?;
//!
//! let result = processor.commit_batch(batch)?;
//! assert!(result.success);
//! assert_eq!(store.len(), 4);
//!
//! if let Some(ctx) = processor.context(batch) {
//!     history.record_batch_action(ctx.operations(), &result);
//! }
//! history.undo(processor.store_mut())?;
//! assert!(store.is_empty());
//! # Ok::<(), gridtx_core::BatchError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod change;
mod config;
mod error;
mod history;
mod operation;
mod result;
mod selection;
mod stats;
mod types;

pub use batch::{BatchContext, BatchProcessor, BatchState, BatchStatus};
pub use change::{CellChange, ChangeSet, ChangeType};
pub use config::{BatchConfig, HistoryConfig};
pub use error::{BatchError, BatchResult};
pub use history::{UndoAction, UndoRedoManager};
pub use operation::{
    BulkOperation, ClearOperation, OperationKind, ReplayDirection, ReplayOperation,
    SetValueOperation, SetValueOptions, DEFAULT_PREVIEW_LIMIT,
};
pub use result::{
    BatchOperationResult, BatchPreview, OperationMetadata, OperationPreview, OperationResult,
};
pub use selection::Selection;
pub use stats::{ProcessorStats, StatsSnapshot};
pub use types::{ActionId, BatchId};

pub use gridtx_store::{
    CellAddress, CellStore, CellValue, InMemoryCellStore, StoreError, StoreResult,
};
