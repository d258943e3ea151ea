//! Sequential scan over a heap file.

use crate::access::tuple::Tuple;
use crate::access::TupleIterator;
use crate::catalog::TableId;
use crate::concurrency::LockMode;
use crate::error::Result;
use crate::storage::buffer::BufferPool;
use crate::storage::disk::PageManager;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Visits pages in page-number order, each fetched with a shared lock, and yields occupied
/// slots in slot order. Nothing is fetched until the first call to `next`.
pub struct HeapFileIterator {
    pool: BufferPool,
    store: Arc<Mutex<PageManager>>,
    table_id: TableId,
    tid: TransactionId,
    next_page: u32,
    pending: VecDeque<Tuple>,
    done: bool,
}

impl HeapFileIterator {
    pub fn new(
        pool: BufferPool,
        store: Arc<Mutex<PageManager>>,
        table_id: TableId,
        tid: TransactionId,
    ) -> Self {
        Self {
            pool,
            store,
            table_id,
            tid,
            next_page: 0,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Buffers the next page's tuples. Returns false past the last page.
    fn load_next_page(&mut self) -> Result<bool> {
        let num_pages = self.store.lock().num_pages()?;
        if self.next_page >= num_pages {
            return Ok(false);
        }

        let page_id = PageId::new(self.table_id, self.next_page);
        let page = self.pool.get_page(self.tid, page_id, LockMode::Shared)?;
        self.pending.extend(page.read().tuples());
        self.next_page += 1;
        Ok(true)
    }
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.pending.pop_front() {
                return Some(Ok(tuple));
            }
            if self.done {
                return None;
            }

            match self.load_next_page() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl TupleIterator for HeapFileIterator {
    fn rewind(&mut self) {
        self.next_page = 0;
        self.pending.clear();
        self.done = false;
    }
}
