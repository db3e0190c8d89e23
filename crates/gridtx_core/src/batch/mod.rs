//! Atomic batches of bulk operations.
//!
//! A batch moves through a simple lifecycle:
//!
//! ```text
//! Open --commit--> Committed
//!   |  \--commit (failure)--> RolledBack
//!   |--rollback--> RolledBack
//!   \--cancel--> Cancelled
//! ```
//!
//! Conflicts and limits are checked when operations are added; nothing
//! touches the cell store until commit.

mod context;
mod processor;

pub use context::{BatchContext, BatchState, BatchStatus};
pub use processor::BatchProcessor;
