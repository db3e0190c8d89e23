//! # gridtx Testkit
//!
//! Test utilities for gridtx.
//!
//! This crate provides:
//! - A fault-injecting, access-counting cell store
//! - Grid and operation builders for common scenarios
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use gridtx_core::BatchProcessor;
//! use gridtx_testkit::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let store = FaultyCellStore::new(scenarios::initial_diagonal());
//! store.fail_on_write(2);
//!
//! let mut processor = BatchProcessor::new(store.clone());
//! let batch = processor.begin_batch(BTreeMap::new());
//! processor
//!     .add_operation(batch, overwrite_text(scenarios::diagonal(), "batch test"))
//!     .unwrap();
//!
//! let result = processor.commit_batch(batch).unwrap();
//! assert!(result.was_rolled_back);
//! assert_eq!(store.snapshot(), scenarios::initial_diagonal().snapshot());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
