//! Error types for cell store operations.

use crate::address::CellAddress;
use thiserror::Error;

/// Result type for cell store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during cell store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A read from the store failed.
    #[error("read failed at {address}: {reason}")]
    ReadFailed {
        /// The address being read.
        address: CellAddress,
        /// Why the read failed.
        reason: String,
    },

    /// The store refused a write or delete.
    #[error("write rejected at {address}: {reason}")]
    WriteRejected {
        /// The address being written.
        address: CellAddress,
        /// Why the write was rejected.
        reason: String,
    },

    /// An address key could not be parsed.
    #[error("invalid address key: {key:?}")]
    InvalidAddressKey {
        /// The offending key.
        key: String,
    },
}

impl StoreError {
    /// Creates a read failure.
    pub fn read_failed(address: CellAddress, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            address,
            reason: reason.into(),
        }
    }

    /// Creates a write rejection.
    pub fn write_rejected(address: CellAddress, reason: impl Into<String>) -> Self {
        Self::WriteRejected {
            address,
            reason: reason.into(),
        }
    }
}
