use crate::access::scan::HeapFileIterator;
use crate::access::tuple::Tuple;
use crate::access::{TableFile, TupleIterator};
use crate::catalog::TableId;
use crate::concurrency::LockMode;
use crate::error::{Error, Result};
use crate::storage::buffer::{BufferPool, PageRef};
use crate::storage::disk::PageManager;
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// A table stored as a file of slotted pages, in no particular order.
pub struct HeapFile {
    table_id: TableId,
    tuple_width: usize,
    page_size: usize,
    store: Arc<Mutex<PageManager>>,
}

impl HeapFile {
    /// Creates an empty table file, truncating anything at `path`.
    pub fn create(
        path: &Path,
        table_id: TableId,
        tuple_width: usize,
        page_size: usize,
    ) -> Result<Self> {
        Self::check_layout(tuple_width, page_size)?;
        let store = PageManager::create(path, page_size)?;
        Ok(Self::with_store(store, table_id, tuple_width, page_size))
    }

    /// Opens a table file, keeping existing pages.
    pub fn open(path: &Path, table_id: TableId, tuple_width: usize, page_size: usize) -> Result<Self> {
        Self::check_layout(tuple_width, page_size)?;
        let store = PageManager::open(path, page_size)?;
        Ok(Self::with_store(store, table_id, tuple_width, page_size))
    }

    fn with_store(
        store: PageManager,
        table_id: TableId,
        tuple_width: usize,
        page_size: usize,
    ) -> Self {
        Self {
            table_id,
            tuple_width,
            page_size,
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn check_layout(tuple_width: usize, page_size: usize) -> Result<()> {
        if HeapPage::slots_per_page(page_size, tuple_width) == 0 {
            return Err(Error::InvalidPageSize {
                page_size,
                reason: format!("cannot hold a single {}-byte tuple", tuple_width),
            });
        }
        Ok(())
    }

    pub fn slots_per_page(&self) -> usize {
        HeapPage::slots_per_page(self.page_size, self.tuple_width)
    }

    fn check_owner(&self, table_id: TableId) -> Result<()> {
        if table_id != self.table_id {
            return Err(Error::TableMismatch {
                expected: self.table_id,
                found: table_id,
            });
        }
        Ok(())
    }
}

impl TableFile for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn tuple_width(&self) -> usize {
        self.tuple_width
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn num_pages(&self) -> Result<u32> {
        self.store.lock().num_pages()
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_owner(page_id.table_id)?;
        let mut data = HeapPage::empty_page_data(self.page_size);
        self.store.lock().read_page(page_id, &mut data)?;
        HeapPage::new(page_id, data, self.tuple_width)
    }

    fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.check_owner(page.page_id().table_id)?;
        self.store.lock().write_page(page.page_id(), page.data())
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if tuple.data.len() != self.tuple_width {
            return Err(Error::TupleWidthMismatch {
                expected: self.tuple_width,
                actual: tuple.data.len(),
            });
        }

        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let page_id = PageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
            {
                let mut heap_page = page.write();
                if heap_page.num_empty_slots() == 0 {
                    continue;
                }
                heap_page.insert_tuple(tuple)?;
                heap_page.mark_dirty(Some(tid));
            }
            return Ok(vec![page]);
        }

        // Every page is full: append an empty page on disk first, so an abort leaves only an
        // empty page behind.
        let page_no = self.store.lock().allocate_page()?;
        let page_id = PageId::new(self.table_id, page_no);
        debug!("{} allocated {}", tid, page_id);

        let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
        {
            let mut heap_page = page.write();
            heap_page.insert_tuple(tuple)?;
            heap_page.mark_dirty(Some(tid));
        }
        Ok(vec![page])
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let record_id = tuple.record_id.ok_or(Error::MissingRecordId)?;
        self.check_owner(record_id.page_id.table_id)?;

        let page = pool.get_page(tid, record_id.page_id, LockMode::Exclusive)?;
        {
            let mut heap_page = page.write();
            heap_page.delete_tuple(tuple)?;
            heap_page.mark_dirty(Some(tid));
        }
        Ok(vec![page])
    }

    fn iter(&self, pool: &BufferPool, tid: TransactionId) -> Box<dyn TupleIterator> {
        Box::new(HeapFileIterator::new(
            pool.clone(),
            Arc::clone(&self.store),
            self.table_id,
            tid,
        ))
    }
}
