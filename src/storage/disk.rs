pub mod disk_manager;

pub use disk_manager::DiskManager;

/// Size of every page on disk and in the buffer pool.
pub const PAGE_SIZE: usize = 4096;
