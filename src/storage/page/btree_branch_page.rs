use crate::storage::disk::PAGE_SIZE;
use crate::storage::page::btree_node::{
    binary_search_by, compare_key, repack, NodeType, Pair, NODE_HEADER_SIZE,
};
use crate::storage::page::slotted_page::{SlottedPage, POINTER_SIZE, SLOTTED_HEADER_SIZE};
use crate::storage::page::{PageId, PAGE_ID_SIZE};
use std::cmp::Ordering;

// Header: right child page id (8), after the node tag
pub const BRANCH_HEADER_SIZE: usize = PAGE_ID_SIZE;
const RIGHT_CHILD_OFFSET: usize = NODE_HEADER_SIZE;
const BODY_OFFSET: usize = NODE_HEADER_SIZE + BRANCH_HEADER_SIZE;

pub const MAX_BRANCH_PAIR_SIZE: usize =
    (PAGE_SIZE - BODY_OFFSET - SLOTTED_HEADER_SIZE) / 2 - POINTER_SIZE;

/// Branch node: `(separator key, left child)` pairs sorted by key, plus the right child for
/// keys at or above the last separator. N separators address N + 1 children.
pub struct BranchNode<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> BranchNode<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn right_child(&self) -> PageId {
        PageId::from_bytes(&self.bytes.as_ref()[RIGHT_CHILD_OFFSET..])
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

    pub fn search_slot_num(&self, key: &[u8]) -> Result<usize, usize> {
        binary_search_by(self.num_pairs(), |slot| {
            compare_key(self.pair_at(slot).key, key)
        })
    }

    /// Slot of the child whose subtree covers `key`. A key equal to a separator belongs to the
    /// subtree right of it.
    pub fn search_child_slot_num(&self, key: &[u8]) -> usize {
        match self.search_slot_num(key) {
            Ok(slot) => slot + 1,
            Err(slot) => slot,
        }
    }

    /// `slot == num_pairs()` addresses the right child.
    pub fn child_page_id_at(&self, slot: usize) -> PageId {
        if slot == self.num_pairs() {
            self.right_child()
        } else {
            PageId::from_bytes(self.pair_at(slot).value)
        }
    }

    pub fn search_child(&self, key: &[u8]) -> PageId {
        self.child_page_id_at(self.search_child_slot_num(key))
    }

    pub fn is_half_full(&self) -> bool {
        let body = self.body();
        2 * body.free_space() < body.capacity()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BranchNode<B> {
    /// Sets up a branch with one separator and two children, as used for a new root.
    pub fn initialize(&mut self, key: &[u8], left_child: PageId, right_child: PageId) {
        self.reset();
        let inserted = self.insert(0, key, left_child);
        assert!(inserted, "new branch must have space for one pair");
        self.set_right_child(right_child);
    }

    fn reset(&mut self) {
        NodeType::Branch.write_tag(self.bytes.as_mut());
        self.set_right_child(PageId::INVALID);
        self.body_mut().initialize();
    }

    pub fn set_right_child(&mut self, page_id: PageId) {
        page_id.write_to(&mut self.bytes.as_mut()[RIGHT_CHILD_OFFSET..]);
    }

    fn body_mut(&mut self) -> SlottedPage<&mut [u8]> {
        SlottedPage::new(&mut self.bytes.as_mut()[BODY_OFFSET..])
    }

    pub fn insert(&mut self, slot: usize, key: &[u8], left_child: PageId) -> bool {
        let child = left_child.to_bytes();
        let pair = Pair::new(key, &child);
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

    fn transfer<C: AsRef<[u8]> + AsMut<[u8]>>(&mut self, dest: &mut BranchNode<C>) {
        let next = dest.num_pairs();
        {
            let cell = self.body().cell(0);
            let mut dest_body = dest.body_mut();
            let inserted = dest_body.insert(next, cell.len());
            assert!(inserted, "split destination branch overflowed");
            dest_body.data_mut(next).copy_from_slice(cell);
        }
        self.body_mut().remove(0);
    }

    /// Splits a full branch while inserting `(key, left_child)`, the same way a leaf splits.
    /// Afterwards the last pair of `new_branch` is removed: its child becomes the right child of
    /// `new_branch` and its key is returned as the separator for the parent.
    pub fn split_insert<C: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        new_branch: &mut BranchNode<C>,
        key: &[u8],
        left_child: PageId,
    ) -> Vec<u8> {
        new_branch.reset();
        let mut insert_into_self = false;
        loop {
            if new_branch.is_half_full() {
                insert_into_self = true;
                break;
            }
            if compare_key(self.pair_at(0).key, key) == Ordering::Less {
                self.transfer(new_branch);
            } else {
                let inserted = new_branch.insert(new_branch.num_pairs(), key, left_child);
                assert!(inserted, "new branch must have space");
                while !new_branch.is_half_full() {
                    self.transfer(new_branch);
                }
                break;
            }
        }

        repack(&mut self.body_mut());
        if insert_into_self {
            let slot = self
                .search_slot_num(key)
                .expect_err("split key must be unique");
            let inserted = self.insert(slot, key, left_child);
            assert!(inserted, "old branch must have space after split");
        }

        let separator = new_branch.fill_right_child();
        repack(&mut new_branch.body_mut());
        separator
    }

    fn fill_right_child(&mut self) -> Vec<u8> {
        let last = self.num_pairs() - 1;
        let (key, right_child) = {
            let pair = self.pair_at(last);
            (pair.key.to_vec(), PageId::from_bytes(pair.value))
        };
        self.body_mut().remove(last);
        self.set_right_child(right_child);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{FileId, PageNumber};

    fn pid(n: u32) -> PageId {
        PageId::new(FileId(0), PageNumber(n))
    }

    #[test]
    fn test_initialize() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut branch = BranchNode::new(&mut page[..]);
        branch.initialize(b"m", pid(1), pid(2));

        assert_eq!(NodeType::of(&page), NodeType::Branch);
        let branch = BranchNode::new(&page[..]);
        assert_eq!(branch.num_pairs(), 1);
        assert_eq!(branch.child_page_id_at(0), pid(1));
        assert_eq!(branch.child_page_id_at(1), pid(2));
        assert_eq!(branch.right_child(), pid(2));
        assert_eq!(branch.max_pair_size(), MAX_BRANCH_PAIR_SIZE);
    }

    #[test]
    fn test_search_child() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut branch = BranchNode::new(&mut page[..]);
        branch.initialize(b"d", pid(1), pid(3));
        assert!(branch.insert(1, b"h", pid(2)));

        // children: [..d) -> 1, [d..h) -> 2, [h..) -> 3
        assert_eq!(branch.search_child(b"a"), pid(1));
        assert_eq!(branch.search_child(b"d"), pid(2));
        assert_eq!(branch.search_child(b"e"), pid(2));
        assert_eq!(branch.search_child(b"h"), pid(3));
        assert_eq!(branch.search_child(b"z"), pid(3));
        assert_eq!(branch.search_child_slot_num(b"h"), 2);
    }

    #[test]
    fn test_split_insert_promotes_separator() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut branch = BranchNode::new(&mut page[..]);
        branch.initialize(&0u32.to_be_bytes(), pid(0), pid(u32::MAX - 1));

        let key_pad = [0x55u8; 60];
        let make_key = |n: u32| {
            let mut key = (n * 2).to_be_bytes().to_vec();
            key.extend_from_slice(&key_pad);
            key
        };
        let mut n = 1;
        loop {
            let key = make_key(n);
            let slot = branch.search_slot_num(&key).unwrap_err();
            if !branch.insert(slot, &key, pid(n)) {
                break;
            }
            n += 1;
        }
        let total = branch.num_pairs();
        let old_right = branch.right_child();

        let mut new_page = vec![0u8; PAGE_SIZE];
        let mut new_branch = BranchNode::new(&mut new_page[..]);
        let mut new_key = 7u32.to_be_bytes().to_vec();
        new_key.extend_from_slice(&key_pad);
        let separator = branch.split_insert(&mut new_branch, &new_key, pid(1000));

        // one separator leaves for the parent
        assert_eq!(branch.num_pairs() + new_branch.num_pairs(), total);
        assert_eq!(branch.right_child(), old_right);
        for slot in 0..new_branch.num_pairs() {
            assert!(new_branch.pair_at(slot).key < &separator[..]);
        }
        assert!(&separator[..] < branch.pair_at(0).key);
        // the promoted pair's child now sits on the right of the new branch
        assert!(new_branch.right_child().is_valid());
    }
}
