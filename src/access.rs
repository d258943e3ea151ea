//! Access layer for tuple-oriented operations.
//!
//! - **TableFile**: the capability set a table's storage exposes to the buffer pool
//! - **HeapFile**: unordered table stored as a file of slotted pages
//! - **HeapFileIterator**: restartable page-by-page scan through the buffer pool
//! - **Tuple / RecordId**: fixed-width rows and their on-page location
//!
//! Table files never cache pages themselves: every page they touch on behalf of a transaction
//! is fetched through the [`BufferPool`], which takes the matching lock first.

pub mod heap;
pub mod scan;
pub mod tuple;

pub use heap::HeapFile;
pub use scan::HeapFileIterator;
pub use tuple::{RecordId, Tuple};

use crate::catalog::TableId;
use crate::error::Result;
use crate::storage::buffer::{BufferPool, PageRef};
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;

/// Storage of one table, addressed in pages.
pub trait TableFile: Send + Sync {
    fn table_id(&self) -> TableId;

    /// Width in bytes of every tuple this table stores.
    fn tuple_width(&self) -> usize;

    fn page_size(&self) -> usize;

    fn num_pages(&self) -> Result<u32>;

    /// Reads a page straight from disk, bypassing the buffer pool.
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Writes a page straight to disk.
    fn write_page(&self, page: &HeapPage) -> Result<()>;

    /// Adds a tuple on behalf of `tid`, stamping its record id. Returns the pages that now
    /// differ from their on-disk image.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>>;

    /// Removes a stored tuple on behalf of `tid`. Returns the modified pages.
    fn delete_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: &Tuple)
        -> Result<Vec<PageRef>>;

    /// Lazily scans every tuple with shared locks held by `tid`.
    fn iter(&self, pool: &BufferPool, tid: TransactionId) -> Box<dyn TupleIterator>;
}

/// A scan that can be restarted from the first page.
pub trait TupleIterator: Iterator<Item = Result<Tuple>> + Send {
    fn rewind(&mut self);
}
