//! Transaction handle tying a transaction id to the buffer pool it works through.

use log::warn;

use super::id::TransactionId;
use super::state::TransactionState;
use crate::access::{Tuple, TupleIterator};
use crate::catalog::TableId;
use crate::concurrency::LockMode;
use crate::error::Result;
use crate::storage::buffer::{BufferPool, PageRef};
use crate::storage::page::PageId;

/// A running transaction.
///
/// Every page access goes through the pool under this transaction's id, so locks accumulate
/// until [`commit`](Self::commit) or [`abort`](Self::abort). Dropping a handle that is still
/// active aborts it.
pub struct Transaction {
    id: TransactionId,
    pool: BufferPool,
    state: TransactionState,
}

impl Transaction {
    pub fn new(id: TransactionId, pool: BufferPool) -> Self {
        Self {
            id,
            pool,
            state: TransactionState::Active,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn get_page(&self, page_id: PageId, mode: LockMode) -> Result<PageRef> {
        self.pool.get_page(self.id, page_id, mode)
    }

    pub fn insert_tuple(&self, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        self.pool.insert_tuple(self.id, table_id, tuple)
    }

    pub fn delete_tuple(&self, tuple: &Tuple) -> Result<()> {
        self.pool.delete_tuple(self.id, tuple)
    }

    /// Scans a table with shared locks held by this transaction.
    pub fn scan(&self, table_id: TableId) -> Result<Box<dyn TupleIterator>> {
        let file = self.pool.catalog().table_file(table_id)?;
        Ok(file.iter(&self.pool, self.id))
    }

    /// Flushes this transaction's pages and releases its locks.
    pub fn commit(mut self) -> Result<()> {
        self.finish(true)
    }

    /// Discards this transaction's pages and releases its locks.
    pub fn abort(mut self) -> Result<()> {
        self.finish(false)
    }

    fn finish(&mut self, commit: bool) -> Result<()> {
        let result = self.pool.transaction_complete(self.id, commit);
        self.state = if commit && result.is_ok() {
            TransactionState::Committed
        } else {
            TransactionState::Aborted
        };
        result
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.state.is_finished() {
            if let Err(e) = self.finish(false) {
                warn!("failed to abort {} on drop: {}", self.id, e);
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
