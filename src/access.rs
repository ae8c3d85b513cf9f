//! Access methods over the storage layer.
//!
//! - **BTree**: ordered byte-string keys with a forward iterator over the leaf chain
//! - **memcomparable**: packs several fields into one key that sorts field by field

pub mod btree;
pub mod memcomparable;

pub use btree::{BTree, BTreeIterator, Scan, SearchMode};
