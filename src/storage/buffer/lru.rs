use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::{BTreeMap, HashMap};

/// Least-recently-used replacer driven by a monotonically increasing access counter.
#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Access stamp -> page, oldest first
    order: BTreeMap<u64, PageId>,
    /// Latest stamp of every tracked page
    stamps: HashMap<PageId, u64>,
    counter: u64,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: BTreeMap::new(),
            stamps: HashMap::with_capacity(capacity),
            counter: 0,
        }
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        self.counter += 1;
        if let Some(old) = self.stamps.insert(page_id, self.counter) {
            self.order.remove(&old);
        }
        self.order.insert(self.counter, page_id);
    }

    fn remove(&mut self, page_id: PageId) {
        if let Some(stamp) = self.stamps.remove(&page_id) {
            self.order.remove(&stamp);
        }
    }

    fn victim(&mut self, evictable: &dyn Fn(PageId) -> bool) -> Option<PageId> {
        let (stamp, page_id) = self
            .order
            .iter()
            .find(|(_, page_id)| evictable(**page_id))
            .map(|(stamp, page_id)| (*stamp, *page_id))?;

        self.order.remove(&stamp);
        self.stamps.remove(&page_id);
        Some(page_id)
    }

    fn size(&self) -> usize {
        self.stamps.len()
    }
}
