pub mod buffer_page;
pub mod clock;

use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{FileId, PageId};
use buffer_page::BufferPage;
use clock::BufferPool;
use log::{debug, trace, warn};
use std::collections::HashMap;

/// Caches pages of every registered heap file in a fixed number of slots.
///
/// There is no pin count. A page handed out by [`fetch_page`](Self::fetch_page) or
/// [`add_page`](Self::add_page) borrows the manager mutably, so it has to be dropped before the
/// next call that could evict it; callers re-fetch instead of keeping references around.
pub struct BufferPoolManager {
    disk_managers: HashMap<FileId, DiskManager>,
    next_file_id: u32,
    pool: BufferPool,
    page_table: HashMap<PageId, usize>,
}

impl BufferPoolManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            disk_managers: HashMap::new(),
            next_file_id: 0,
            pool: BufferPool::new(capacity),
            page_table: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of pages currently resident.
    pub fn len(&self) -> usize {
        self.page_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_table.is_empty()
    }

    pub fn register_disk_manager(&mut self, file_id: FileId, disk_manager: DiskManager) {
        if self.disk_managers.insert(file_id, disk_manager).is_some() {
            warn!("Replaced disk manager for file {}", file_id);
        }
        self.next_file_id = self.next_file_id.max(file_id.0.saturating_add(1));
    }

    pub fn allocate_file_id(&mut self) -> FileId {
        let file_id = FileId(self.next_file_id);
        self.next_file_id += 1;
        file_id
    }

    pub fn allocate_page_id(&mut self, file_id: FileId) -> StorageResult<PageId> {
        let disk_manager = self
            .disk_managers
            .get_mut(&file_id)
            .ok_or(StorageError::DiskManagerNotFound(file_id))?;
        Ok(PageId::new(file_id, disk_manager.allocate_page()))
    }

    /// Returns the cached page, reading it from its heap file on a miss.
    pub fn fetch_page(&mut self, page_id: PageId) -> StorageResult<&mut BufferPage> {
        if let Some(&slot) = self.page_table.get(&page_id) {
            trace!("Page table hit: {}", page_id);
            let page = self.pool.get_mut(slot);
            page.set_referenced(true);
            return Ok(page);
        }

        trace!("Page table miss: {}", page_id);
        let slot = self.add_page_slot(page_id)?;
        let disk_manager = self
            .disk_managers
            .get_mut(&page_id.file_id)
            .ok_or(StorageError::DiskManagerNotFound(page_id.file_id))?;
        let page = self.pool.get_mut(slot);
        if let Err(err) = disk_manager.read_page_data(page_id.page_number, page.load_buf()) {
            // leave the slot as a clean, unmapped victim
            page.reset(PageId::INVALID);
            page.set_referenced(false);
            self.page_table.remove(&page_id);
            return Err(err);
        }
        Ok(page)
    }

    /// Reserves a zeroed slot for `page_id` without reading from disk. Used for brand-new pages
    /// whose contents the caller is about to overwrite completely.
    pub fn add_page(&mut self, page_id: PageId) -> StorageResult<&mut BufferPage> {
        let slot = self.add_page_slot(page_id)?;
        Ok(self.pool.get_mut(slot))
    }

    fn add_page_slot(&mut self, page_id: PageId) -> StorageResult<usize> {
        // a page of an unknown file could never be written back once dirty
        if !self.disk_managers.contains_key(&page_id.file_id) {
            return Err(StorageError::DiskManagerNotFound(page_id.file_id));
        }

        if let Some(&slot) = self.page_table.get(&page_id) {
            self.pool.get_mut(slot).reset(page_id);
            return Ok(slot);
        }

        if !self.pool.is_full() {
            let slot = self.pool.push(BufferPage::new(page_id));
            self.page_table.insert(page_id, slot);
            return Ok(slot);
        }

        // On a failed write-back the victim stays mapped and dirty; the next sweep retries it.
        let slot = self.pool.sweep();
        let victim = self.pool.get_mut(slot);
        let victim_id = victim.page_id();
        if victim.is_dirty() {
            let disk_manager = self
                .disk_managers
                .get_mut(&victim_id.file_id)
                .ok_or(StorageError::DiskManagerNotFound(victim_id.file_id))?;
            disk_manager.write_page_data(victim_id.page_number, victim.data())?;
            debug!("Evicted dirty page {} from slot {} for {}", victim_id, slot, page_id);
        } else {
            debug!("Evicted page {} from slot {} for {}", victim_id, slot, page_id);
        }

        self.page_table.remove(&victim_id);
        self.page_table.insert(page_id, slot);
        self.pool.get_mut(slot).reset(page_id);
        self.pool.advance_hand();
        Ok(slot)
    }

    /// Clears the referenced bit so the page becomes the next eviction candidate.
    pub fn un_ref_page(&mut self, page_id: PageId) {
        if let Some(&slot) = self.page_table.get(&page_id) {
            self.pool.get_mut(slot).set_referenced(false);
        }
    }

    /// Writes one page back if it is resident and dirty.
    pub fn flush_page(&mut self, page_id: PageId) -> StorageResult<()> {
        if let Some(&slot) = self.page_table.get(&page_id) {
            let page = self.pool.get_mut(slot);
            if page.is_dirty() {
                let disk_manager = self
                    .disk_managers
                    .get_mut(&page_id.file_id)
                    .ok_or(StorageError::DiskManagerNotFound(page_id.file_id))?;
                disk_manager.write_page_data(page_id.page_number, page.data())?;
                page.clear_dirty();
            }
        }
        Ok(())
    }

    /// Writes every dirty page back, then syncs every registered heap file.
    pub fn flush_all(&mut self) -> StorageResult<()> {
        let mut written = 0;
        for (&page_id, &slot) in &self.page_table {
            let page = self.pool.get_mut(slot);
            if !page.is_dirty() {
                continue;
            }
            let disk_manager = self
                .disk_managers
                .get_mut(&page_id.file_id)
                .ok_or(StorageError::DiskManagerNotFound(page_id.file_id))?;
            disk_manager.write_page_data(page_id.page_number, page.data())?;
            page.clear_dirty();
            written += 1;
        }

        for disk_manager in self.disk_managers.values_mut() {
            disk_manager.sync()?;
        }
        debug!("Flushed {} dirty pages", written);
        Ok(())
    }

    /// Looks up a resident page without touching its flags or the disk.
    pub fn get_buffer_page(&mut self, page_id: PageId) -> Option<&mut BufferPage> {
        let slot = *self.page_table.get(&page_id)?;
        Some(self.pool.get_mut(slot))
    }

    pub fn get_disk_manager(&mut self, file_id: FileId) -> Option<&mut DiskManager> {
        self.disk_managers.get_mut(&file_id)
    }
}
