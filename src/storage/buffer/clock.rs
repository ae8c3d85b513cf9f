use super::buffer_page::BufferPage;

/// Fixed-capacity slot array with a clock hand for second-chance replacement.
pub struct BufferPool {
    pages: Vec<BufferPage>,
    capacity: usize,
    clock_hand: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        Self {
            pages: Vec::with_capacity(capacity),
            capacity,
            clock_hand: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pages.len() >= self.capacity
    }

    pub fn clock_hand(&self) -> usize {
        self.clock_hand
    }

    /// Appends a page to a non-full pool and returns its slot.
    pub fn push(&mut self, page: BufferPage) -> usize {
        debug_assert!(!self.is_full());
        self.pages.push(page);
        self.pages.len() - 1
    }

    pub fn get(&self, slot: usize) -> &BufferPage {
        &self.pages[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut BufferPage {
        &mut self.pages[slot]
    }

    /// Runs the clock from the current hand: referenced pages lose their bit and are skipped,
    /// the first unreferenced page is the victim. The hand is left on the victim's slot.
    ///
    /// Terminates within one full rotation plus one step since nothing is pinned.
    pub fn sweep(&mut self) -> usize {
        loop {
            let page = &mut self.pages[self.clock_hand];
            if !page.is_referenced() {
                return self.clock_hand;
            }
            page.set_referenced(false);
            self.advance_hand();
        }
    }

    pub fn advance_hand(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.pages.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{FileId, PageId, PageNumber};

    fn page(n: u32) -> BufferPage {
        BufferPage::new(PageId::new(FileId(0), PageNumber(n)))
    }

    #[test]
    fn test_sweep_clears_bits_then_wraps() {
        let mut pool = BufferPool::new(3);
        for n in 0..3 {
            pool.push(page(n));
        }
        assert!(pool.is_full());

        // every page referenced: one full rotation, victim is the starting slot
        assert_eq!(pool.sweep(), 0);
        assert!((0..3).all(|slot| !pool.get(slot).is_referenced()));
        pool.advance_hand();
        assert_eq!(pool.clock_hand(), 1);
    }

    #[test]
    fn test_sweep_skips_referenced() {
        let mut pool = BufferPool::new(3);
        for n in 0..3 {
            pool.push(page(n));
        }
        pool.get_mut(0).set_referenced(true);
        pool.get_mut(1).set_referenced(false);
        pool.get_mut(2).set_referenced(false);

        assert_eq!(pool.sweep(), 1);
        assert!(!pool.get(0).is_referenced());
    }
}
