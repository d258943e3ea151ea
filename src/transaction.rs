//! Transaction identity and lifecycle.
//!
//! A transaction is an id plus the locks and dirty pages accumulated under it. It ends with a
//! commit, which flushes its pages, or an abort, which discards them.

pub mod handle;
pub mod id;
pub mod state;

pub use handle::Transaction;
pub use id::{TransactionId, TransactionIdGenerator};
pub use state::TransactionState;
