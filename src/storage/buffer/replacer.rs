use crate::storage::page::PageId;
use std::fmt::Debug;

/// Victim selection policy for the buffer pool.
pub trait Replacer: Send + Sync + Debug {
    /// Record that a page was fetched or (re)installed.
    fn record_access(&mut self, page_id: PageId);

    /// Forget a page that left the cache.
    fn remove(&mut self, page_id: PageId);

    /// Pick and forget a page among those `evictable` accepts. Returns None if no
    /// tracked page qualifies.
    fn victim(&mut self, evictable: &dyn Fn(PageId) -> bool) -> Option<PageId>;

    /// Get the number of tracked pages.
    fn size(&self) -> usize;
}
