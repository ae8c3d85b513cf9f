//! Page addressing and the on-page formats built on top of raw page bytes.

pub mod btree_branch_page;
pub mod btree_leaf_page;
pub mod btree_node;
pub mod meta_page;
pub mod slotted_page;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialized size of a [`PageId`]: 4 bytes file id + 4 bytes page number.
pub const PAGE_ID_SIZE: usize = 8;

/// Identifies one heap file registered with the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a page inside its heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageNumber(pub u32);

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable address of one fixed-size page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    pub file_id: FileId,
    pub page_number: PageNumber,
}

impl PageId {
    /// Sentinel stored on disk where no page is referenced (e.g. a missing leaf sibling).
    pub const INVALID: PageId = PageId {
        file_id: FileId(u32::MAX),
        page_number: PageNumber(u32::MAX),
    };

    pub fn new(file_id: FileId, page_number: PageNumber) -> Self {
        Self {
            file_id,
            page_number,
        }
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Maps the on-disk sentinel to `None`.
    pub fn valid(self) -> Option<PageId> {
        if self.is_valid() { Some(self) } else { None }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            file_id: FileId(LittleEndian::read_u32(&bytes[0..4])),
            page_number: PageNumber(LittleEndian::read_u32(&bytes[4..8])),
        }
    }

    pub fn to_bytes(self) -> [u8; PAGE_ID_SIZE] {
        let mut bytes = [0u8; PAGE_ID_SIZE];
        self.write_to(&mut bytes);
        bytes
    }

    pub fn write_to(self, bytes: &mut [u8]) {
        LittleEndian::write_u32(&mut bytes[0..4], self.file_id.0);
        LittleEndian::write_u32(&mut bytes[4..8], self.page_number.0);
    }
}

impl From<Option<PageId>> for PageId {
    fn from(page_id: Option<PageId>) -> Self {
        page_id.unwrap_or(PageId::INVALID)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.page_number)
    }
}
