//! Page-level strict two-phase locking.
//!
//! Every page has either a set of shared holders or a single exclusive holder. A transaction
//! keeps every lock it acquires until [`LockManager::release_all`] is called at commit or
//! abort. A blocked request sleeps on a condition variable owned by the page it wants and is
//! woken whenever a holder of that page lets go.
//!
//! Deadlock detection is a single-hop test run once, before the first wait: if any current
//! holder of the wanted page is itself waiting for a page the requester holds, the requester is
//! aborted. Cycles through three or more transactions are not detected.

use crate::error::{Error, Result};
use crate::storage::PageId;
use crate::transaction::TransactionId;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

/// Lock state of one page.
#[derive(Debug, Default)]
struct PageLock {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
    /// Waiters for this page sleep here
    cv: Arc<Condvar>,
}

impl PageLock {
    /// Whether `tid` already holds a lock at least as strong as `mode`.
    fn covers(&self, tid: TransactionId, mode: LockMode) -> bool {
        match mode {
            LockMode::Shared => self.exclusive == Some(tid) || self.shared.contains(&tid),
            LockMode::Exclusive => self.exclusive == Some(tid),
        }
    }

    fn try_grant(&mut self, tid: TransactionId, mode: LockMode) -> bool {
        if self.covers(tid, mode) {
            return true;
        }
        if self.exclusive.is_some() {
            return false;
        }

        match mode {
            LockMode::Shared => {
                self.shared.insert(tid);
                true
            }
            LockMode::Exclusive => {
                let sole_holder = self.shared.len() == 1 && self.shared.contains(&tid);
                if self.shared.is_empty() || sole_holder {
                    self.shared.clear();
                    self.exclusive = Some(tid);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn holders(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.shared.iter().copied().chain(self.exclusive)
    }

    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

#[derive(Debug, Default)]
struct LockTable {
    pages: HashMap<PageId, PageLock>,
    /// Pages each transaction holds a lock on
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// The page each blocked transaction is waiting for
    intentions: HashMap<TransactionId, PageId>,
}

impl LockTable {
    fn would_deadlock(&self, tid: TransactionId, page_id: PageId) -> bool {
        let (Some(lock), Some(held)) = (self.pages.get(&page_id), self.held.get(&tid)) else {
            return false;
        };

        lock.holders().filter(|holder| *holder != tid).any(|holder| {
            self.intentions
                .get(&holder)
                .is_some_and(|wanted| held.contains(wanted))
        })
    }

    fn release(&mut self, tid: TransactionId, page_id: PageId) {
        if let Some(lock) = self.pages.get_mut(&page_id) {
            lock.shared.remove(&tid);
            if lock.exclusive == Some(tid) {
                lock.exclusive = None;
            }
            lock.cv.notify_all();

            // Keep the entry while a waiter still sleeps on its condvar.
            if lock.is_free() && Arc::strong_count(&lock.cv) == 1 {
                self.pages.remove(&page_id);
            }
        }

        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&page_id);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
    }
}

/// Tracks page locks for all running transactions.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    /// Creates a new lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a lock, blocking until it can be granted.
    ///
    /// Fails with [`Error::TransactionAborted`] if waiting would close a wait-for cycle; the
    /// caller must then abort `tid`.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        let mut table = self.table.lock();

        if table
            .pages
            .get(&page_id)
            .is_some_and(|lock| lock.covers(tid, mode))
        {
            return Ok(());
        }

        table.intentions.insert(tid, page_id);
        if table.would_deadlock(tid, page_id) {
            table.intentions.remove(&tid);
            warn!("{} aborted: deadlock waiting for {:?} on {}", tid, mode, page_id);
            return Err(Error::TransactionAborted { tid, page_id });
        }

        loop {
            let lock = table.pages.entry(page_id).or_default();
            if lock.try_grant(tid, mode) {
                table.intentions.remove(&tid);
                table.held.entry(tid).or_default().insert(page_id);
                debug!("{} granted {:?} on {}", tid, mode, page_id);
                return Ok(());
            }

            let cv = Arc::clone(&lock.cv);
            debug!("{} waiting for {:?} on {}", tid, mode, page_id);
            cv.wait(&mut table);
        }
    }

    /// Releases one lock. Releasing a lock that is not held is a no-op.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        self.table.lock().release(tid, page_id);
    }

    /// Releases every lock `tid` holds and forgets the transaction.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        if let Some(pages) = table.held.remove(&tid) {
            for page_id in pages {
                table.release(tid, page_id);
            }
        }
        table.intentions.remove(&tid);
    }

    /// True iff `tid` holds any lock on the page.
    pub fn holds(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.table
            .lock()
            .held
            .get(&tid)
            .is_some_and(|pages| pages.contains(&page_id))
    }

    /// Pages `tid` holds a lock on, in page order.
    pub fn pages_held(&self, tid: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<_> = table
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    pub fn exclusive_holder(&self, page_id: PageId) -> Option<TransactionId> {
        self.table
            .lock()
            .pages
            .get(&page_id)
            .and_then(|lock| lock.exclusive)
    }

    pub fn shared_holders(&self, page_id: PageId) -> Vec<TransactionId> {
        let table = self.table.lock();
        let mut holders: Vec<_> = table
            .pages
            .get(&page_id)
            .map(|lock| lock.shared.iter().copied().collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// The page `tid` is currently blocked on, if any.
    pub fn waiting_on(&self, tid: TransactionId) -> Option<PageId> {
        self.table.lock().intentions.get(&tid).copied()
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let table = self.table.lock();
        for (page_id, lock) in &table.pages {
            assert!(
                lock.exclusive.is_none() || lock.shared.is_empty(),
                "{} has both shared and exclusive holders",
                page_id
            );
            for holder in lock.holders() {
                assert!(table.held.get(&holder).is_some_and(|p| p.contains(page_id)));
            }
        }
    }
}
