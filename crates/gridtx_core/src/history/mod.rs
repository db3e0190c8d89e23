//! Undo/redo history.
//!
//! Actions are recorded from the results of executed operations and
//! committed batches. Inverses are derived from the recorded
//! [`CellChange`](crate::CellChange) records alone:
//!
//! - every cell restored to the same value: one set-value over all cells
//! - every cell restored to empty: one clear
//! - anything else: a replay of each cell's own recorded value

mod action;
mod manager;

pub use action::UndoAction;
pub use manager::UndoRedoManager;
