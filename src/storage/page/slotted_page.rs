//! Variable-length cell storage inside one byte buffer.
//!
//! Layout:
//!
//! ```text
//! | header (8) | pointer 0 | pointer 1 | ... -> free space <- ... | cell 1 | cell 0 |
//! ```
//!
//! The header holds the slot count and the offset of the lowest cell. Each pointer is
//! `(offset: u16, len: u16)`. Cells are carved from the end of the buffer towards the front and
//! are never moved to make room for other cells.

use byteorder::{ByteOrder, LittleEndian};

pub const SLOTTED_HEADER_SIZE: usize = 8;
pub const POINTER_SIZE: usize = 4;

const NUM_SLOTS_OFFSET: usize = 0;
const FREE_SPACE_OFFSET_OFFSET: usize = 2;

pub struct SlottedPage<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.as_ref().len() - SLOTTED_HEADER_SIZE
    }

    pub fn num_slots(&self) -> usize {
        LittleEndian::read_u16(&self.bytes.as_ref()[NUM_SLOTS_OFFSET..]) as usize
    }

    fn free_space_offset(&self) -> usize {
        LittleEndian::read_u16(&self.bytes.as_ref()[FREE_SPACE_OFFSET_OFFSET..]) as usize
    }

    /// Bytes left between the end of the pointer array and the lowest cell.
    pub fn free_space(&self) -> usize {
        self.free_space_offset()
            .saturating_sub(SLOTTED_HEADER_SIZE + self.num_slots() * POINTER_SIZE)
    }

    fn pointer(&self, index: usize) -> (usize, usize) {
        let at = SLOTTED_HEADER_SIZE + index * POINTER_SIZE;
        let bytes = self.bytes.as_ref();
        (
            LittleEndian::read_u16(&bytes[at..]) as usize,
            LittleEndian::read_u16(&bytes[at + 2..]) as usize,
        )
    }

    pub fn data(&self, index: usize) -> &[u8] {
        assert!(index < self.num_slots(), "slot {} out of range", index);
        let (offset, len) = self.pointer(index);
        &self.bytes.as_ref()[offset..offset + len]
    }
}

impl<'a> SlottedPage<&'a [u8]> {
    /// Like [`data`](Self::data), but borrows from the underlying buffer instead of the view.
    pub fn cell(&self, index: usize) -> &'a [u8] {
        assert!(index < self.num_slots(), "slot {} out of range", index);
        let (offset, len) = self.pointer(index);
        let bytes: &'a [u8] = self.bytes;
        &bytes[offset..offset + len]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    pub fn initialize(&mut self) {
        let len = self.bytes.as_ref().len();
        self.set_num_slots(0);
        self.set_free_space_offset(len);
    }

    fn set_num_slots(&mut self, num_slots: usize) {
        LittleEndian::write_u16(&mut self.bytes.as_mut()[NUM_SLOTS_OFFSET..], num_slots as u16);
    }

    fn set_free_space_offset(&mut self, offset: usize) {
        LittleEndian::write_u16(
            &mut self.bytes.as_mut()[FREE_SPACE_OFFSET_OFFSET..],
            offset as u16,
        );
    }

    fn set_pointer(&mut self, index: usize, offset: usize, len: usize) {
        let at = SLOTTED_HEADER_SIZE + index * POINTER_SIZE;
        let bytes = self.bytes.as_mut();
        LittleEndian::write_u16(&mut bytes[at..], offset as u16);
        LittleEndian::write_u16(&mut bytes[at + 2..], len as u16);
    }

    pub fn data_mut(&mut self, index: usize) -> &mut [u8] {
        assert!(index < self.num_slots(), "slot {} out of range", index);
        let (offset, len) = self.pointer(index);
        &mut self.bytes.as_mut()[offset..offset + len]
    }

    /// Allocates a `len`-byte cell below the lowest cell and inserts its pointer at `index`.
    /// Returns false, leaving the page untouched, if the cell and its pointer do not fit.
    pub fn insert(&mut self, index: usize, len: usize) -> bool {
        if self.free_space() < len + POINTER_SIZE {
            return false;
        }
        let num_slots = self.num_slots();
        assert!(index <= num_slots, "slot {} out of range", index);

        let offset = self.free_space_offset() - len;
        let from = SLOTTED_HEADER_SIZE + index * POINTER_SIZE;
        let to = SLOTTED_HEADER_SIZE + num_slots * POINTER_SIZE;
        self.bytes.as_mut().copy_within(from..to, from + POINTER_SIZE);

        self.set_pointer(index, offset, len);
        self.set_num_slots(num_slots + 1);
        self.set_free_space_offset(offset);
        true
    }

    /// Changes the length of a cell without relocating any other cell.
    ///
    /// The lowest (most recently allocated) cell borders free space, so it can grow or shrink by
    /// moving its start; its leading bytes are preserved. Any other cell can only shrink in place,
    /// and the trimmed tail stays unusable until the page is reinitialized.
    pub fn resize(&mut self, index: usize, len_new: usize) -> bool {
        let (offset, len) = self.pointer(index);
        if len_new == len {
            return true;
        }

        let free_space_offset = self.free_space_offset();
        if offset != free_space_offset {
            if len_new > len {
                return false;
            }
            self.set_pointer(index, offset, len_new);
            return true;
        }

        if len_new > len && len_new - len > self.free_space() {
            return false;
        }
        let offset_new = offset + len - len_new;
        let keep = len.min(len_new);
        self.bytes
            .as_mut()
            .copy_within(offset..offset + keep, offset_new);
        self.set_pointer(index, offset_new, len_new);
        self.set_free_space_offset(offset_new);
        true
    }

    /// Drops the pointer at `index`. The cell bytes are not returned to free space.
    pub fn remove(&mut self, index: usize) {
        let num_slots = self.num_slots();
        assert!(index < num_slots, "slot {} out of range", index);

        let from = SLOTTED_HEADER_SIZE + (index + 1) * POINTER_SIZE;
        let to = SLOTTED_HEADER_SIZE + num_slots * POINTER_SIZE;
        self.bytes.as_mut().copy_within(from..to, from - POINTER_SIZE);
        self.set_num_slots(num_slots - 1);
    }
}
