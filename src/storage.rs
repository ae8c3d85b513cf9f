//! Storage layer of vibestore.
//!
//! Pages are the unit of I/O and caching:
//!
//! - **DiskManager**: reads and writes fixed-size pages of one heap file
//! - **BufferPoolManager**: caches pages of all registered files, evicting by clock sweep
//! - **SlottedPage**: variable-length cells inside one page
//! - **LeafNode / BranchNode / MetaPage**: the B+Tree page formats
//!
//! Access methods built on these pages live in [`crate::access`].

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::buffer_page::BufferPage;
pub use buffer::BufferPoolManager;
pub use disk::{DiskManager, PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{FileId, PageId, PageNumber};
