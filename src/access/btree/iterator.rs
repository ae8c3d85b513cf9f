use crate::storage::buffer::BufferPoolManager;
use crate::storage::error::StorageResult;
use crate::storage::page::btree_leaf_page::LeafNode;
use crate::storage::page::PageId;

/// An owned `(key, value)` pair read out of a leaf.
pub type OwnedPair = (Vec<u8>, Vec<u8>);

/// Forward cursor over the leaf chain.
///
/// Only the position is kept; every call re-fetches the current leaf from the buffer pool,
/// since the page may have been evicted in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeIterator {
    page_id: PageId,
    slot: usize,
}

impl BTreeIterator {
    pub(crate) fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The pair under the cursor, or `None` once the iterator is exhausted.
    pub fn get(&self, buffer_pool: &mut BufferPoolManager) -> StorageResult<Option<OwnedPair>> {
        let page = buffer_pool.fetch_page(self.page_id)?;
        let leaf = LeafNode::new(page.data());
        if self.slot < leaf.num_pairs() {
            Ok(Some(leaf.pair_at(self.slot).to_owned_pair()))
        } else {
            Ok(None)
        }
    }

    /// Moves to the next pair, following the next-sibling link when the current leaf runs out.
    /// Past the last leaf the iterator stays exhausted.
    pub fn advance(&mut self, buffer_pool: &mut BufferPoolManager) -> StorageResult<()> {
        self.slot = self.slot.saturating_add(1);
        loop {
            let next_page_id = {
                let page = buffer_pool.fetch_page(self.page_id)?;
                let leaf = LeafNode::new(page.data());
                if self.slot < leaf.num_pairs() {
                    return Ok(());
                }
                leaf.next_page_id()
            };
            let Some(next_page_id) = next_page_id else {
                return Ok(());
            };
            buffer_pool.un_ref_page(self.page_id);
            buffer_pool.fetch_page(next_page_id)?;
            self.page_id = next_page_id;
            self.slot = 0;
        }
    }

    /// [`get`](Self::get) followed by [`advance`](Self::advance).
    pub fn next(
        &mut self,
        buffer_pool: &mut BufferPoolManager,
    ) -> StorageResult<Option<OwnedPair>> {
        let pair = self.get(buffer_pool)?;
        self.advance(buffer_pool)?;
        Ok(pair)
    }

    /// Borrows the buffer pool for the rest of the scan, turning the cursor into a std iterator.
    pub fn scan(self, buffer_pool: &mut BufferPoolManager) -> Scan<'_> {
        Scan {
            iter: self,
            buffer_pool,
            failed: false,
        }
    }
}

/// Remaining pairs of a [`BTreeIterator`] in ascending key order. Stops after the first error.
pub struct Scan<'a> {
    iter: BTreeIterator,
    buffer_pool: &'a mut BufferPoolManager,
    failed: bool,
}

impl Iterator for Scan<'_> {
    type Item = StorageResult<OwnedPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.iter.next(self.buffer_pool).transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}
