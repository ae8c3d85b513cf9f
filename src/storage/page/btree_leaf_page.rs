use crate::storage::disk::PAGE_SIZE;
use crate::storage::page::btree_node::{
    binary_search_by, compare_key, repack, NodeType, Pair, NODE_HEADER_SIZE,
};
use crate::storage::page::slotted_page::{SlottedPage, POINTER_SIZE, SLOTTED_HEADER_SIZE};
use crate::storage::page::{PageId, PAGE_ID_SIZE};
use std::cmp::Ordering;

// Header: prev page id (8) + next page id (8), after the node tag
pub const LEAF_HEADER_SIZE: usize = 2 * PAGE_ID_SIZE;
const PREV_PAGE_ID_OFFSET: usize = NODE_HEADER_SIZE;
const NEXT_PAGE_ID_OFFSET: usize = PREV_PAGE_ID_OFFSET + PAGE_ID_SIZE;
const BODY_OFFSET: usize = NODE_HEADER_SIZE + LEAF_HEADER_SIZE;

/// Largest serialized pair a full-page leaf accepts. Two such pairs always fit in one leaf, which
/// is what keeps a split from overflowing either half.
pub const MAX_LEAF_PAIR_SIZE: usize =
    (PAGE_SIZE - BODY_OFFSET - SLOTTED_HEADER_SIZE) / 2 - POINTER_SIZE;

/// Leaf node: sorted key-value pairs plus links to the neighbouring leaves.
pub struct LeafNode<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn prev_page_id(&self) -> Option<PageId> {
        PageId::from_bytes(&self.bytes.as_ref()[PREV_PAGE_ID_OFFSET..]).valid()
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        PageId::from_bytes(&self.bytes.as_ref()[NEXT_PAGE_ID_OFFSET..]).valid()
    }

    pub fn body(&self) -> SlottedPage<&[u8]> {
        SlottedPage::new(&self.bytes.as_ref()[BODY_OFFSET..])
    }

    pub fn num_pairs(&self) -> usize {
        self.body().num_slots()
    }

    pub fn pair_at(&self, slot: usize) -> Pair<'_> {
        Pair::from_bytes(self.body().cell(slot))
    }

    pub fn max_pair_size(&self) -> usize {
        self.body().capacity() / 2 - POINTER_SIZE
    }

    /// `Ok(slot)` on an exact match, otherwise `Err(slot)` with the sorted insertion point.
    pub fn search_slot_num(&self, key: &[u8]) -> Result<usize, usize> {
        binary_search_by(self.num_pairs(), |slot| {
            compare_key(self.pair_at(slot).key, key)
        })
    }

    /// More than half of the body is in use.
    pub fn is_half_full(&self) -> bool {
        let body = self.body();
        2 * body.free_space() < body.capacity()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    pub fn initialize(&mut self) {
        let bytes = self.bytes.as_mut();
        NodeType::Leaf.write_tag(bytes);
        PageId::INVALID.write_to(&mut bytes[PREV_PAGE_ID_OFFSET..]);
        PageId::INVALID.write_to(&mut bytes[NEXT_PAGE_ID_OFFSET..]);
        self.body_mut().initialize();
    }

    pub fn set_prev_page_id(&mut self, page_id: Option<PageId>) {
        PageId::from(page_id).write_to(&mut self.bytes.as_mut()[PREV_PAGE_ID_OFFSET..]);
    }

    pub fn set_next_page_id(&mut self, page_id: Option<PageId>) {
        PageId::from(page_id).write_to(&mut self.bytes.as_mut()[NEXT_PAGE_ID_OFFSET..]);
    }

    fn body_mut(&mut self) -> SlottedPage<&mut [u8]> {
        SlottedPage::new(&mut self.bytes.as_mut()[BODY_OFFSET..])
    }

    /// Inserts at `slot`, which must keep the pairs sorted. Returns false if the pair is larger
    /// than [`max_pair_size`](Self::max_pair_size) or the body has no room; the leaf is
    /// unchanged in both cases.
    pub fn insert(&mut self, slot: usize, key: &[u8], value: &[u8]) -> bool {
        let pair = Pair::new(key, value);
        let len = pair.encoded_len();
        if len > self.max_pair_size() {
            return false;
        }
        let mut body = self.body_mut();
        if !body.insert(slot, len) {
            return false;
        }
        pair.write_to(body.data_mut(slot));
        true
    }

    /// Moves the first pair of `self` to the end of `dest`.
    fn transfer<C: AsRef<[u8]> + AsMut<[u8]>>(&mut self, dest: &mut LeafNode<C>) {
        let next = dest.num_pairs();
        {
            let cell = self.body().cell(0);
            let mut dest_body = dest.body_mut();
            let inserted = dest_body.insert(next, cell.len());
            assert!(inserted, "split destination leaf overflowed");
            dest_body.data_mut(next).copy_from_slice(cell);
        }
        self.body_mut().remove(0);
    }

    /// Splits a full leaf while inserting `key`.
    ///
    /// The lower pairs move into `new_leaf` until it is more than half full by bytes; the new
    /// pair lands on whichever side keeps the order. Returns the smallest key left in `self`,
    /// which separates `new_leaf` (everything below it) from `self`. Sibling links are left to
    /// the caller.
    pub fn split_insert<C: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        new_leaf: &mut LeafNode<C>,
        key: &[u8],
        value: &[u8],
    ) -> Vec<u8> {
        new_leaf.initialize();
        let mut insert_into_self = false;
        loop {
            if new_leaf.is_half_full() {
                insert_into_self = true;
                break;
            }
            if compare_key(self.pair_at(0).key, key) == Ordering::Less {
                self.transfer(new_leaf);
            } else {
                let inserted = new_leaf.insert(new_leaf.num_pairs(), key, value);
                assert!(inserted, "new leaf must have space");
                while !new_leaf.is_half_full() {
                    self.transfer(new_leaf);
                }
                break;
            }
        }

        repack(&mut self.body_mut());
        if insert_into_self {
            let slot = self
                .search_slot_num(key)
                .expect_err("split key must be unique");
            let inserted = self.insert(slot, key, value);
            assert!(inserted, "old leaf must have space after split");
        }
        self.pair_at(0).key.to_vec()
    }
}
