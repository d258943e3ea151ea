pub mod lru;
pub mod replacer;

use crate::access::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::{LockManager, LockMode};
use crate::error::{Error, Result};
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use self::lru::LruReplacer;
use self::replacer::Replacer;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a cached page. Every fetch of a resident page returns the same object.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Bounded page cache that every page access goes through.
///
/// A fetch first takes the page lock for the transaction, then serves the page from memory or
/// loads it from its table file. Dirty pages are never evicted (NO-STEAL): they stay resident
/// until their transaction commits, which flushes them, or aborts, which discards them.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    cache: Mutex<PageCache>,
    capacity: usize,
}

struct PageCache {
    pages: HashMap<PageId, PageRef>,
    replacer: Box<dyn Replacer>,
}

impl PageCache {
    /// Drops the least recently used clean page. Leaves the cache untouched on failure.
    fn evict(&mut self, capacity: usize) -> Result<PageId> {
        let pages = &self.pages;
        let victim = self.replacer.victim(&|page_id| {
            pages
                .get(&page_id)
                .is_some_and(|page| !page.read().is_dirty())
        });

        match victim {
            Some(page_id) => {
                self.pages.remove(&page_id);
                debug!("evicted {} ({} pages left)", page_id, self.replacer.size());
                Ok(page_id)
            }
            None => Err(Error::BufferPoolFull { capacity }),
        }
    }

    /// Caches `page`, replacing any stale copy, evicting first if a new slot is needed.
    fn install(&mut self, page_id: PageId, page: PageRef, capacity: usize) -> Result<()> {
        if !self.pages.contains_key(&page_id) && self.pages.len() >= capacity {
            self.evict(capacity)?;
        }
        self.pages.insert(page_id, page);
        self.replacer.record_access(page_id);
        debug_assert_eq!(self.replacer.size(), self.pages.len());
        Ok(())
    }

    fn remove(&mut self, page_id: PageId) -> Option<PageRef> {
        self.replacer.remove(page_id);
        self.pages.remove(&page_id)
    }
}

impl BufferPool {
    pub fn new(
        catalog: Arc<Catalog>,
        lock_manager: Arc<LockManager>,
        replacer: Box<dyn Replacer>,
        capacity: usize,
    ) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                catalog,
                lock_manager,
                cache: Mutex::new(PageCache {
                    pages: HashMap::with_capacity(capacity),
                    replacer,
                }),
                capacity,
            }),
        }
    }

    /// A pool evicting the least recently used clean page.
    pub fn with_lru(catalog: Arc<Catalog>, lock_manager: Arc<LockManager>, capacity: usize) -> Self {
        Self::new(
            catalog,
            lock_manager,
            Box::new(LruReplacer::new(capacity)),
            capacity,
        )
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.inner.lock_manager
    }

    /// Fetches a page for `tid`, blocking until the lock for `mode` is granted.
    ///
    /// Fails with [`Error::TransactionAborted`] on deadlock and with
    /// [`Error::BufferPoolFull`] when the page must be loaded but every cached page is dirty.
    pub fn get_page(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<PageRef> {
        self.inner.lock_manager.acquire(tid, page_id, mode)?;

        let mut cache = self.inner.cache.lock();
        if let Some(page) = cache.pages.get(&page_id).cloned() {
            cache.replacer.record_access(page_id);
            return Ok(page);
        }

        let file = self.inner.catalog.table_file(page_id.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(page_id)?));
        cache.install(page_id, Arc::clone(&page), self.inner.capacity)?;
        debug!("{} loaded {}", tid, page_id);

        Ok(page)
    }

    /// Inserts `tuple` into `table_id` and marks the touched pages dirty for `tid`.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let file = self.inner.catalog.table_file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Deletes a stored tuple from the table its record id points at.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id.ok_or(Error::MissingRecordId)?;
        let file = self.inner.catalog.table_file(record_id.page_id.table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    fn install_dirty(&self, tid: TransactionId, pages: Vec<PageRef>) -> Result<()> {
        for page in pages {
            let page_id = {
                let mut heap_page = page.write();
                heap_page.mark_dirty(Some(tid));
                heap_page.page_id()
            };
            self.inner
                .cache
                .lock()
                .install(page_id, page, self.inner.capacity)?;
        }
        Ok(())
    }

    /// Evicts one clean page. Never writes anything back.
    pub fn evict_page(&self) -> Result<PageId> {
        self.inner.cache.lock().evict(self.inner.capacity)
    }

    /// Writes a resident dirty page to disk and marks it clean. No-op otherwise.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let Some(page) = self.inner.cache.lock().pages.get(&page_id).cloned() else {
            return Ok(());
        };

        let mut heap_page = page.write();
        if heap_page.is_dirty() {
            let file = self.inner.catalog.table_file(page_id.table_id)?;
            file.write_page(&heap_page)?;
            heap_page.mark_dirty(None);
            trace!("flushed {}", page_id);
        }
        Ok(())
    }

    /// Flushes every resident page, including pages of running transactions.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = self.inner.cache.lock().pages.keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Flushes the pages `tid` holds a lock on.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for page_id in self.inner.lock_manager.pages_held(tid) {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        if self.inner.cache.lock().remove(page_id).is_some() {
            trace!("discarded {}", page_id);
        }
    }

    /// Ends `tid`: on commit its pages are flushed, on abort they are discarded. All of its
    /// locks are released either way.
    ///
    /// If a flush fails the remaining pages are discarded as on abort and the error is
    /// returned; pages already written stay written.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let pages = self.inner.lock_manager.pages_held(tid);

        let result = if commit {
            pages
                .iter()
                .try_for_each(|&page_id| self.flush_page(page_id))
        } else {
            Ok(())
        };
        if !commit || result.is_err() {
            for &page_id in &pages {
                self.discard_page(page_id);
            }
        }

        self.inner.lock_manager.release_all(tid);
        debug!(
            "{} {} ({} pages)",
            tid,
            if commit { "committed" } else { "aborted" },
            pages.len()
        );
        result
    }

    /// Same as `transaction_complete(tid, true)`.
    pub fn commit_transaction(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, true)
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.inner.lock_manager.holds(tid, page_id)
    }

    /// Releases one lock before the transaction ends.
    ///
    /// This breaks two-phase locking; only callers that know the page was never used for
    /// anything the transaction depends on may call it.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.inner.lock_manager.release(tid, page_id);
    }

    pub fn cached_pages(&self) -> usize {
        self.inner.cache.lock().pages.len()
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.inner.cache.lock().pages.contains_key(&page_id)
    }
}
