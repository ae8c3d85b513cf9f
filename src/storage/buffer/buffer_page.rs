use crate::storage::disk::PAGE_SIZE;
use crate::storage::page::PageId;

/// One cached page. Owned by the buffer pool's slot array; callers only ever see it through a
/// borrow of the [`BufferPoolManager`](crate::storage::BufferPoolManager), so a reference can
/// not survive a later fetch that might evict it.
pub struct BufferPage {
    page_id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    is_referenced: bool,
    is_dirty: bool,
}

impl BufferPage {
    pub(crate) fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            data: Box::new([0u8; PAGE_SIZE]),
            is_referenced: true,
            is_dirty: false,
        }
    }

    /// Zeroes the page and stamps it with a new id, as if freshly created.
    pub(crate) fn reset(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.data.fill(0);
        self.is_referenced = true;
        self.is_dirty = false;
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Mutable access to the page bytes. Marks the page dirty and referenced.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        self.is_referenced = true;
        &mut self.data[..]
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn is_referenced(&self) -> bool {
        self.is_referenced
    }

    pub(crate) fn set_referenced(&mut self, is_referenced: bool) {
        self.is_referenced = is_referenced;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.is_dirty = false;
    }

    /// Page bytes for loading from disk, without touching the dirty bit.
    pub(crate) fn load_buf(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{FileId, PageNumber};

    #[test]
    fn test_accessor_side_effects() {
        let page_id = PageId::new(FileId(0), PageNumber(3));
        let mut page = BufferPage::new(page_id);
        assert!(!page.is_dirty());
        assert!(page.data().iter().all(|&b| b == 0));

        page.set_referenced(false);
        let _ = page.data();
        assert!(!page.is_referenced());
        assert!(!page.is_dirty());

        page.data_mut()[0] = 7;
        assert!(page.is_referenced());
        assert!(page.is_dirty());

        page.reset(PageId::new(FileId(0), PageNumber(4)));
        assert_eq!(page.page_id(), PageId::new(FileId(0), PageNumber(4)));
        assert_eq!(page.data()[0], 0);
        assert!(!page.is_dirty());
    }
}
