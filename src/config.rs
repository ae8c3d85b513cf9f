//! Engine configuration.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::FileId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "./vibestore_data";
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 64;
const HEAP_FILE_EXTENSION: &str = "db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one heap file per FileId.
    pub data_dir: PathBuf,
    /// Number of page slots in the buffer pool.
    pub buffer_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            buffer_pool_size: DEFAULT_BUFFER_POOL_SIZE,
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_buffer_pool_size(mut self, buffer_pool_size: usize) -> Self {
        self.buffer_pool_size = buffer_pool_size;
        self
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.buffer_pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "buffer_pool_size must be at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig(
                "data_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the heap file for `file_id`: `<data_dir>/<n>.db`.
    pub fn heap_file_path(&self, file_id: FileId) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", file_id.0, HEAP_FILE_EXTENSION))
    }

    /// Inverse of [`heap_file_path`](Self::heap_file_path); `None` for anything else in the
    /// data directory.
    pub fn parse_heap_file_name(path: &Path) -> Option<FileId> {
        if path.extension()? != HEAP_FILE_EXTENSION {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok().map(FileId)
    }
}
