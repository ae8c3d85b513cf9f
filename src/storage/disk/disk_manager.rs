use crate::storage::disk::PAGE_SIZE;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageNumber;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Raw page I/O against one heap file.
pub struct DiskManager {
    heap_file: File,
    next_page_number: u32,
}

impl DiskManager {
    /// Creates (or truncates) the heap file at `path`.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let heap_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            heap_file,
            next_page_number: 0,
        })
    }

    /// Opens the heap file at `path`, creating it if missing. Page numbering resumes after the
    /// last whole page already in the file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let heap_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(heap_file)
    }

    /// Wraps an already opened heap file. Page numbering resumes after its last whole page.
    pub fn from_file(heap_file: File) -> StorageResult<Self> {
        let file_size = heap_file.metadata()?.len();

        Ok(Self {
            heap_file,
            next_page_number: (file_size / PAGE_SIZE as u64) as u32,
        })
    }

    pub fn read_page_data(&mut self, page_number: PageNumber, buf: &mut [u8]) -> StorageResult<()> {
        Self::check_len(buf.len())?;
        self.heap_file
            .seek(SeekFrom::Start(Self::page_offset(page_number)))?;
        self.heap_file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_page_data(&mut self, page_number: PageNumber, data: &[u8]) -> StorageResult<()> {
        Self::check_len(data.len())?;
        self.heap_file
            .seek(SeekFrom::Start(Self::page_offset(page_number)))?;
        self.heap_file.write_all(data)?;
        Ok(())
    }

    /// Mints the next unused page number. The page is not written or zeroed on disk.
    pub fn allocate_page(&mut self) -> PageNumber {
        let page_number = PageNumber(self.next_page_number);
        self.next_page_number += 1;
        page_number
    }

    /// Number of pages minted so far, including those recovered from the file size at open.
    pub fn num_pages(&self) -> u32 {
        self.next_page_number
    }

    pub fn sync(&mut self) -> StorageResult<()> {
        self.heap_file.flush()?;
        self.heap_file.sync_all()?;
        Ok(())
    }

    fn check_len(len: usize) -> StorageResult<()> {
        if len != PAGE_SIZE {
            return Err(StorageError::PageSizeMismatch {
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }

    fn page_offset(page_number: PageNumber) -> u64 {
        page_number.0 as u64 * PAGE_SIZE as u64
    }
}
