use crate::storage::page::PageId;

const ROOT_PAGE_ID_OFFSET: usize = 0;

/// The one-page record holding a B+Tree's current root.
pub struct MetaPage<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> MetaPage<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn root_page_id(&self) -> PageId {
        PageId::from_bytes(&self.bytes.as_ref()[ROOT_PAGE_ID_OFFSET..])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MetaPage<B> {
    pub fn set_root_page_id(&mut self, root_page_id: PageId) {
        root_page_id.write_to(&mut self.bytes.as_mut()[ROOT_PAGE_ID_OFFSET..]);
    }
}
