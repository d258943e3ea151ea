//! Registry of the tables the buffer pool can reach.
//!
//! The catalog maps table ids and names to the [`TableFile`] holding each table's pages. Table
//! ids come from a counter and are never reused within a process.

pub mod table_info;

pub use table_info::{TableId, TableInfo};

use crate::access::TableFile;
use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub struct Catalog {
    tables: DashMap<TableId, TableInfo>,
    names: DashMap<String, TableId>,
    next_table_id: AtomicU32,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            names: DashMap::new(),
            next_table_id: AtomicU32::new(1),
        }
    }

    /// Reserves a fresh table id for a file about to be registered.
    pub fn allocate_table_id(&self) -> TableId {
        TableId(self.next_table_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Registers a table file under `name`. The file's own id is the key.
    pub fn add_table(&self, name: &str, file: Arc<dyn TableFile>) -> Result<TableId> {
        let table_id = file.table_id();
        match self.names.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(Error::DuplicateTable(name.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(table_id);
            }
        }

        self.tables.insert(
            table_id,
            TableInfo {
                table_id,
                table_name: name.to_string(),
                file,
            },
        );
        Ok(table_id)
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.names
            .get(name)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::TableNameNotFound(name.to_string()))
    }

    pub fn table_file(&self, table_id: TableId) -> Result<Arc<dyn TableFile>> {
        self.tables
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.value().file))
            .ok_or(Error::TableNotFound(table_id))
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.value().table_name.clone())
            .ok_or(Error::TableNotFound(table_id))
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
