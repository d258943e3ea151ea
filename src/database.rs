use crate::access::{HeapFile, TableFile};
use crate::catalog::{Catalog, TableId};
use crate::concurrency::LockManager;
use crate::config::DbConfig;
use crate::error::Result;
use crate::storage::buffer::BufferPool;
use crate::transaction::{Transaction, TransactionIdGenerator};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// High-level database interface that wires the catalog, lock manager and buffer pool together.
pub struct Database {
    config: DbConfig,
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    buffer_pool: BufferPool,
    txn_ids: TransactionIdGenerator,
}

impl Database {
    pub fn new(config: DbConfig) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(Catalog::new());
        let lock_manager = Arc::new(LockManager::new());
        let buffer_pool = BufferPool::with_lru(
            Arc::clone(&catalog),
            Arc::clone(&lock_manager),
            config.buffer_pool_pages,
        );

        Ok(Self {
            config,
            catalog,
            lock_manager,
            buffer_pool,
            txn_ids: TransactionIdGenerator::new(),
        })
    }

    /// Creates an empty table file at `path` and registers it under `name`.
    pub fn create_table(&self, path: &Path, name: &str, tuple_width: usize) -> Result<TableId> {
        let file = HeapFile::create(
            path,
            self.catalog.allocate_table_id(),
            tuple_width,
            self.config.page_size,
        )?;
        self.register(name, file)
    }

    /// Registers an existing table file, keeping its pages. Creates the file if it is missing.
    pub fn open_table(&self, path: &Path, name: &str, tuple_width: usize) -> Result<TableId> {
        let file = HeapFile::open(
            path,
            self.catalog.allocate_table_id(),
            tuple_width,
            self.config.page_size,
        )?;
        self.register(name, file)
    }

    fn register(&self, name: &str, file: HeapFile) -> Result<TableId> {
        let pages = file.num_pages()?;
        let table_id = self.catalog.add_table(name, Arc::new(file))?;
        info!("registered table {:?} as {} ({} pages)", name, table_id, pages);
        Ok(table_id)
    }

    /// Starts a transaction with a fresh id.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.txn_ids.next(), self.buffer_pool.clone())
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }
}
