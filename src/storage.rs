//! Storage layer for pagedb.
//!
//! - **PageId / HeapPage**: fixed-size slotted pages with an occupancy bitmap header
//! - **PageManager**: positional page I/O against one table file
//! - **BufferPool**: bounded page cache that takes page locks and never evicts dirty pages
//! - **Replacer**: eviction policy plugged into the pool, LRU by default
//!
//! Pages reach disk only when the transaction that dirtied them commits.

pub mod buffer;
pub mod disk;
pub mod page;

pub use buffer::{BufferPool, PageRef};
pub use disk::PageManager;
pub use page::{HeapPage, PageId};
