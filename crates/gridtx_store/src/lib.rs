//! # gridtx Store
//!
//! Cell store capability for the gridtx batch engine.
//!
//! This crate is the lowest layer of gridtx. A cell store is the system of
//! record that batches mutate: it maps [`CellAddress`]es to [`CellValue`]s and
//! knows nothing about batches, rollback, or history.
//!
//! ## Design Principles
//!
//! - Stores are plain key/value maps (get, set, delete, get_all)
//! - Writes must be visible to the very next read (no write-behind)
//! - Absence is `None`, never a sentinel value
//! - Must be `Send + Sync` so a store can be shared with the embedding app
//!
//! ## Available Stores
//!
//! - [`InMemoryCellStore`] - Shared in-memory map, for tests and embedding
//!
//! ## Example
//!
//! ```rust
//! use gridtx_store::{CellAddress, CellStore, CellValue, InMemoryCellStore};
//!
//! let mut store = InMemoryCellStore::new();
//! store.set(CellAddress::new(0, 0), CellValue::text("hello")).unwrap();
//! assert_eq!(
//!     store.get(CellAddress::new(0, 0)).unwrap(),
//!     Some(CellValue::text("hello"))
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod address;
mod error;
mod memory;
mod store;
mod value;

pub use address::CellAddress;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryCellStore;
pub use store::CellStore;
pub use value::CellValue;
