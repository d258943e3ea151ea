//! Page-level strict two-phase locking.
//!
//! Transactions take shared or exclusive locks on pages and keep them until they commit or
//! abort. A request that would close a wait cycle of length two aborts the requester instead
//! of blocking.

pub mod lock;

pub use lock::{LockManager, LockMode};
