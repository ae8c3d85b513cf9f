pub mod iterator;

pub use self::iterator::{BTreeIterator, OwnedPair, Scan};

use crate::storage::buffer::BufferPoolManager;
use crate::storage::disk::PAGE_SIZE;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::btree_branch_page::{BranchNode, MAX_BRANCH_PAIR_SIZE};
use crate::storage::page::btree_leaf_page::{LeafNode, MAX_LEAF_PAIR_SIZE};
use crate::storage::page::btree_node::{Node, NodeType, Pair, KEY_LEN_SIZE};
use crate::storage::page::meta_page::MetaPage;
use crate::storage::page::{FileId, PageId, PAGE_ID_SIZE};
use log::debug;

/// Where a search positions its iterator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// The smallest key in the tree.
    Start,
    /// The given key, or the smallest key above it.
    Key(Vec<u8>),
}

impl SearchMode {
    fn child_page_id<B: AsRef<[u8]>>(&self, branch: &BranchNode<B>) -> PageId {
        match self {
            SearchMode::Start => branch.child_page_id_at(0),
            SearchMode::Key(key) => branch.search_child(key),
        }
    }

    fn leaf_slot_num<B: AsRef<[u8]>>(&self, leaf: &LeafNode<B>) -> usize {
        match self {
            SearchMode::Start => 0,
            SearchMode::Key(key) => match leaf.search_slot_num(key) {
                Ok(slot) | Err(slot) => slot,
            },
        }
    }
}

/// What a subtree reports to its parent after an insert.
enum InsertOutcome {
    NoOverflow,
    /// The subtree's root split. `new_sibling_id` holds every key below `separator_key` and
    /// sits to the left of the page that was descended into.
    Overflow {
        separator_key: Vec<u8>,
        new_sibling_id: PageId,
    },
}

/// B+Tree over byte-string keys, unique and ordered byte-lexicographically.
///
/// The tree itself only remembers its meta page; the root is read from there on every
/// operation. All page access goes through the buffer pool passed to each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTree {
    meta_page_id: PageId,
}

impl BTree {
    /// Creates a tree in `file_id`: a meta page plus one empty leaf as the root.
    pub fn create(buffer_pool: &mut BufferPoolManager, file_id: FileId) -> StorageResult<Self> {
        let meta_page_id = buffer_pool.allocate_page_id(file_id)?;
        let root_page_id = buffer_pool.allocate_page_id(file_id)?;

        {
            let root = buffer_pool.add_page(root_page_id)?;
            LeafNode::new(root.data_mut()).initialize();
        }
        let meta = buffer_pool.add_page(meta_page_id)?;
        MetaPage::new(meta.data_mut()).set_root_page_id(root_page_id);

        debug!("Created B+Tree {} with root {}", meta_page_id, root_page_id);
        Ok(Self { meta_page_id })
    }

    /// Attaches to a tree created earlier.
    pub fn open(meta_page_id: PageId) -> Self {
        Self { meta_page_id }
    }

    pub fn meta_page_id(&self) -> PageId {
        self.meta_page_id
    }

    pub fn root_page_id(&self, buffer_pool: &mut BufferPoolManager) -> StorageResult<PageId> {
        let meta = buffer_pool.fetch_page(self.meta_page_id)?;
        Ok(MetaPage::new(meta.data()).root_page_id())
    }

    /// Number of levels, counting the leaves.
    pub fn height(&self, buffer_pool: &mut BufferPoolManager) -> StorageResult<usize> {
        let mut page_id = self.root_page_id(buffer_pool)?;
        let mut height = 1;
        loop {
            let page = buffer_pool.fetch_page(page_id)?;
            match Node::new(page.data()) {
                Node::Leaf(_) => return Ok(height),
                Node::Branch(branch) => {
                    page_id = branch.child_page_id_at(0);
                    height += 1;
                }
            }
        }
    }

    pub fn search(
        &self,
        buffer_pool: &mut BufferPoolManager,
        mode: SearchMode,
    ) -> StorageResult<BTreeIterator> {
        let root_page_id = self.root_page_id(buffer_pool)?;
        buffer_pool.fetch_page(root_page_id)?;
        buffer_pool.un_ref_page(self.meta_page_id);
        self.search_recursively(buffer_pool, root_page_id, &mode)
    }

    fn search_recursively(
        &self,
        buffer_pool: &mut BufferPoolManager,
        page_id: PageId,
        mode: &SearchMode,
    ) -> StorageResult<BTreeIterator> {
        enum Step {
            Found { slot: usize, past_end: bool },
            Descend(PageId),
        }

        let step = {
            let page = buffer_pool.fetch_page(page_id)?;
            match Node::new(page.data()) {
                Node::Leaf(leaf) => {
                    let slot = mode.leaf_slot_num(&leaf);
                    Step::Found {
                        slot,
                        past_end: slot == leaf.num_pairs(),
                    }
                }
                Node::Branch(branch) => Step::Descend(mode.child_page_id(&branch)),
            }
        };

        match step {
            Step::Found { slot, past_end } => {
                let mut iter = BTreeIterator::new(page_id, slot);
                if past_end {
                    // the next pair, if any, is the first one of the next leaf
                    iter.advance(buffer_pool)?;
                }
                Ok(iter)
            }
            Step::Descend(child_page_id) => {
                buffer_pool.fetch_page(child_page_id)?;
                buffer_pool.un_ref_page(page_id);
                self.search_recursively(buffer_pool, child_page_id, mode)
            }
        }
    }

    /// Exact-match lookup.
    pub fn get(
        &self,
        buffer_pool: &mut BufferPoolManager,
        key: &[u8],
    ) -> StorageResult<Option<Vec<u8>>> {
        let iter = self.search(buffer_pool, SearchMode::Key(key.to_vec()))?;
        match iter.get(buffer_pool)? {
            Some((found, value)) if found == key => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Inserts a new pair. Fails with [`StorageError::DuplicateKey`] if the key exists, leaving
    /// the tree unchanged.
    pub fn insert(
        &self,
        buffer_pool: &mut BufferPoolManager,
        key: &[u8],
        value: &[u8],
    ) -> StorageResult<()> {
        let leaf_pair_size = Pair::new(key, value).encoded_len();
        if leaf_pair_size > MAX_LEAF_PAIR_SIZE {
            return Err(StorageError::PairTooLarge {
                size: leaf_pair_size,
                max: MAX_LEAF_PAIR_SIZE,
            });
        }
        let branch_pair_size = KEY_LEN_SIZE + key.len() + PAGE_ID_SIZE;
        if branch_pair_size > MAX_BRANCH_PAIR_SIZE {
            return Err(StorageError::PairTooLarge {
                size: branch_pair_size,
                max: MAX_BRANCH_PAIR_SIZE,
            });
        }

        let root_page_id = self.root_page_id(buffer_pool)?;
        let outcome = self.insert_recursively(buffer_pool, root_page_id, key, value)?;
        if let InsertOutcome::Overflow {
            separator_key,
            new_sibling_id,
        } = outcome
        {
            let new_root_page_id = buffer_pool.allocate_page_id(self.meta_page_id.file_id)?;
            {
                let page = buffer_pool.add_page(new_root_page_id)?;
                BranchNode::new(page.data_mut()).initialize(
                    &separator_key,
                    new_sibling_id,
                    root_page_id,
                );
            }
            let meta = buffer_pool.fetch_page(self.meta_page_id)?;
            MetaPage::new(meta.data_mut()).set_root_page_id(new_root_page_id);
            debug!(
                "B+Tree {} grew a level: new root {}",
                self.meta_page_id, new_root_page_id
            );
        }
        Ok(())
    }

    fn insert_recursively(
        &self,
        buffer_pool: &mut BufferPoolManager,
        page_id: PageId,
        key: &[u8],
        value: &[u8],
    ) -> StorageResult<InsertOutcome> {
        let node_type = NodeType::of(buffer_pool.fetch_page(page_id)?.data());
        match node_type {
            NodeType::Leaf => self.insert_into_leaf(buffer_pool, page_id, key, value),
            NodeType::Branch => self.insert_into_branch(buffer_pool, page_id, key, value),
        }
    }

    fn insert_into_leaf(
        &self,
        buffer_pool: &mut BufferPoolManager,
        page_id: PageId,
        key: &[u8],
        value: &[u8],
    ) -> StorageResult<InsertOutcome> {
        let slot = {
            let page = buffer_pool.fetch_page(page_id)?;
            match LeafNode::new(page.data()).search_slot_num(key) {
                Ok(_) => return Err(StorageError::DuplicateKey),
                Err(slot) => slot,
            }
        };

        let page = buffer_pool.fetch_page(page_id)?;
        if LeafNode::new(page.data_mut()).insert(slot, key, value) {
            return Ok(InsertOutcome::NoOverflow);
        }

        // Both halves are built in scratch buffers; the pool may evict either page while the
        // other one is being added.
        let mut leaf_bytes = page.data().to_vec();
        let mut new_leaf_bytes = vec![0u8; PAGE_SIZE];
        let new_leaf_page_id = buffer_pool.allocate_page_id(page_id.file_id)?;

        let mut leaf = LeafNode::new(&mut leaf_bytes[..]);
        let mut new_leaf = LeafNode::new(&mut new_leaf_bytes[..]);
        let separator_key = leaf.split_insert(&mut new_leaf, key, value);
        let prev_page_id = leaf.prev_page_id();
        new_leaf.set_prev_page_id(prev_page_id);
        new_leaf.set_next_page_id(Some(page_id));
        leaf.set_prev_page_id(Some(new_leaf_page_id));

        // Not atomic: an I/O error from here until the parent takes the separator leaves the
        // moved pairs in a leaf no branch points to.
        store_page(buffer_pool, new_leaf_page_id, &new_leaf_bytes)?;
        store_page(buffer_pool, page_id, &leaf_bytes)?;
        if let Some(prev_page_id) = prev_page_id {
            let page = buffer_pool.fetch_page(prev_page_id)?;
            LeafNode::new(page.data_mut()).set_next_page_id(Some(new_leaf_page_id));
        }

        debug!("Split leaf {}: new left sibling {}", page_id, new_leaf_page_id);
        Ok(InsertOutcome::Overflow {
            separator_key,
            new_sibling_id: new_leaf_page_id,
        })
    }

    fn insert_into_branch(
        &self,
        buffer_pool: &mut BufferPoolManager,
        page_id: PageId,
        key: &[u8],
        value: &[u8],
    ) -> StorageResult<InsertOutcome> {
        let (child_slot, child_page_id) = {
            let page = buffer_pool.fetch_page(page_id)?;
            let branch = BranchNode::new(page.data());
            let slot = branch.search_child_slot_num(key);
            (slot, branch.child_page_id_at(slot))
        };

        let (separator_key, new_child_page_id) =
            match self.insert_recursively(buffer_pool, child_page_id, key, value)? {
                InsertOutcome::NoOverflow => return Ok(InsertOutcome::NoOverflow),
                InsertOutcome::Overflow {
                    separator_key,
                    new_sibling_id,
                } => (separator_key, new_sibling_id),
            };

        let page = buffer_pool.fetch_page(page_id)?;
        if BranchNode::new(page.data_mut()).insert(child_slot, &separator_key, new_child_page_id) {
            return Ok(InsertOutcome::NoOverflow);
        }

        let mut branch_bytes = page.data().to_vec();
        let mut new_branch_bytes = vec![0u8; PAGE_SIZE];
        let new_branch_page_id = buffer_pool.allocate_page_id(page_id.file_id)?;

        let promoted_key = BranchNode::new(&mut branch_bytes[..]).split_insert(
            &mut BranchNode::new(&mut new_branch_bytes[..]),
            &separator_key,
            new_child_page_id,
        );

        store_page(buffer_pool, new_branch_page_id, &new_branch_bytes)?;
        store_page(buffer_pool, page_id, &branch_bytes)?;

        debug!("Split branch {}: new left sibling {}", page_id, new_branch_page_id);
        Ok(InsertOutcome::Overflow {
            separator_key: promoted_key,
            new_sibling_id: new_branch_page_id,
        })
    }
}

/// Overwrites a whole page without reading its old contents.
fn store_page(
    buffer_pool: &mut BufferPoolManager,
    page_id: PageId,
    bytes: &[u8],
) -> StorageResult<()> {
    buffer_pool.add_page(page_id)?.data_mut().copy_from_slice(bytes);
    Ok(())
}
