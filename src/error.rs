//! Error types shared by every layer of the engine.

use crate::access::RecordId;
use crate::catalog::TableId;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur while touching pages, locks or tables.
#[derive(Error, Debug)]
pub enum Error {
    /// The lock manager found a wait-for cycle; the transaction must be aborted.
    #[error("Transaction {tid} aborted: deadlock detected while waiting for {page_id}")]
    TransactionAborted { tid: TransactionId, page_id: PageId },

    #[error("Buffer pool is full: all {capacity} cached pages are dirty")]
    BufferPoolFull { capacity: usize },

    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    #[error("Table not found: {0:?}")]
    TableNameNotFound(String),

    #[error("Table {0:?} already exists")]
    DuplicateTable(String),

    #[error("Page {page_id} is out of range (file has {num_pages} pages)")]
    PageOutOfRange { page_id: PageId, num_pages: u32 },

    #[error("Tuple belongs to {found}, not to {expected}")]
    TableMismatch { expected: TableId, found: TableId },

    #[error("Tuple is {actual} bytes wide but the table stores {expected}-byte tuples")]
    TupleWidthMismatch { expected: usize, actual: usize },

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Slot {0} is already empty")]
    SlotEmpty(RecordId),

    #[error("Record {record_id} does not live on {page_id}")]
    RecordNotOnPage { record_id: RecordId, page_id: PageId },

    #[error("Page {0} has no free slot")]
    PageFull(PageId),

    #[error("Invalid page size {page_size}: {reason}")]
    InvalidPageSize { page_size: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error is a deadlock abort and the whole transaction may be retried.
    pub fn is_deadlock(&self) -> bool {
        matches!(self, Self::TransactionAborted { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_deadlock() {
        let err = Error::TransactionAborted {
            tid: TransactionId::new(7),
            page_id: PageId::new(TableId(1), 3),
        };
        assert!(err.is_deadlock());
        assert!(!Error::BufferPoolFull { capacity: 2 }.is_deadlock());
    }

    #[test]
    fn test_display() {
        let err = Error::TransactionAborted {
            tid: TransactionId::new(7),
            page_id: PageId::new(TableId(1), 3),
        };
        assert_eq!(
            err.to_string(),
            "Transaction Txn7 aborted: deadlock detected while waiting for Page(1:3)"
        );

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        assert_eq!(io.to_string(), "IO error: disk gone");
    }
}
