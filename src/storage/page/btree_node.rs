//! Shared pieces of the B+Tree node formats.
//!
//! Every node page starts with an 8-byte type tag. The kind-specific header follows, and the
//! rest of the page is a [`SlottedPage`] whose cells are serialized [`Pair`]s kept sorted by key.

use crate::storage::page::btree_branch_page::BranchNode;
use crate::storage::page::btree_leaf_page::LeafNode;
use crate::storage::page::slotted_page::SlottedPage;
use byteorder::{ByteOrder, LittleEndian};
use std::cmp::Ordering;

pub const NODE_HEADER_SIZE: usize = 8;

const LEAF_TAG: &[u8; NODE_HEADER_SIZE] = b"LEAF\0\0\0\0";
const BRANCH_TAG: &[u8; NODE_HEADER_SIZE] = b"BRANCH\0\0";

/// Length prefix of a serialized pair.
pub const KEY_LEN_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Leaf,
    Branch,
}

impl NodeType {
    /// Reads the tag of a node page.
    ///
    /// # Panics
    /// On an unknown tag. A node page that is neither leaf nor branch means on-disk corruption
    /// or a page id that never held a node.
    pub fn of(bytes: &[u8]) -> Self {
        let tag = &bytes[..NODE_HEADER_SIZE];
        if tag == LEAF_TAG {
            NodeType::Leaf
        } else if tag == BRANCH_TAG {
            NodeType::Branch
        } else {
            panic!("corrupt node page: unknown type tag {:?}", tag);
        }
    }

    pub(crate) fn write_tag(self, bytes: &mut [u8]) {
        let tag = match self {
            NodeType::Leaf => LEAF_TAG,
            NodeType::Branch => BRANCH_TAG,
        };
        bytes[..NODE_HEADER_SIZE].copy_from_slice(tag);
    }
}

/// A key-value pair as stored in a node cell: `[key len: u32][key][value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> Pair<'a> {
    pub fn new(key: &'a [u8], value: &'a [u8]) -> Self {
        Self { key, value }
    }

    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        let key_len = LittleEndian::read_u32(&bytes[..KEY_LEN_SIZE]) as usize;
        let (key, value) = bytes[KEY_LEN_SIZE..].split_at(key_len);
        Self { key, value }
    }

    pub fn encoded_len(&self) -> usize {
        KEY_LEN_SIZE + self.key.len() + self.value.len()
    }

    /// Serializes into `buf`, which must be exactly [`encoded_len`](Self::encoded_len) long.
    pub fn write_to(&self, buf: &mut [u8]) {
        let (len, rest) = buf.split_at_mut(KEY_LEN_SIZE);
        let (key, value) = rest.split_at_mut(self.key.len());
        LittleEndian::write_u32(len, self.key.len() as u32);
        key.copy_from_slice(self.key);
        value.copy_from_slice(self.value);
    }

    pub fn to_owned_pair(&self) -> (Vec<u8>, Vec<u8>) {
        (self.key.to_vec(), self.value.to_vec())
    }
}

/// Byte-lexicographic key order.
pub fn compare_key(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Binary search over `size` positions. Same contract as `slice::binary_search_by`.
pub fn binary_search_by<F>(size: usize, mut f: F) -> Result<usize, usize>
where
    F: FnMut(usize) -> Ordering,
{
    let mut left = 0;
    let mut right = size;
    while left < right {
        let mid = left + (right - left) / 2;
        match f(mid) {
            Ordering::Less => left = mid + 1,
            Ordering::Greater => right = mid,
            Ordering::Equal => return Ok(mid),
        }
    }
    Err(left)
}

/// Reinitializes a body and reinserts its live cells, recovering space left behind by removes.
pub(crate) fn repack(body: &mut SlottedPage<&mut [u8]>) {
    let cells: Vec<Vec<u8>> = (0..body.num_slots())
        .map(|index| body.data(index).to_vec())
        .collect();
    body.initialize();
    for (index, cell) in cells.iter().enumerate() {
        let inserted = body.insert(index, cell.len());
        assert!(inserted, "repacked cells must fit");
        body.data_mut(index).copy_from_slice(cell);
    }
}

/// A node page viewed as whichever kind its tag says it is.
pub enum Node<B> {
    Leaf(LeafNode<B>),
    Branch(BranchNode<B>),
}

impl<B: AsRef<[u8]>> Node<B> {
    /// # Panics
    /// If the page does not carry a known node tag.
    pub fn new(bytes: B) -> Self {
        match NodeType::of(bytes.as_ref()) {
            NodeType::Leaf => Node::Leaf(LeafNode::new(bytes)),
            NodeType::Branch => Node::Branch(BranchNode::new(bytes)),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Leaf(_) => NodeType::Leaf,
            Node::Branch(_) => NodeType::Branch,
        }
    }

    pub fn num_pairs(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.num_pairs(),
            Node::Branch(branch) => branch.num_pairs(),
        }
    }

    pub fn body(&self) -> SlottedPage<&[u8]> {
        match self {
            Node::Leaf(leaf) => leaf.body(),
            Node::Branch(branch) => branch.body(),
        }
    }
}
