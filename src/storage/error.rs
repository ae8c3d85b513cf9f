//! Storage layer error types.

use crate::storage::page::FileId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer size must be PAGE_SIZE ({expected}), got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    #[error("Disk manager not found for file {0}")]
    DiskManagerNotFound(FileId),

    #[error("Duplicate key")]
    DuplicateKey,

    #[error("Pair too large: {size} bytes (max: {max})")]
    PairTooLarge { size: usize, max: usize },

    #[error("Invalid memcomparable encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
