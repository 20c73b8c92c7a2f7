//! Persistence for the rollup core.
//!
//! The core never talks to a database directly. It hands every state
//! transition to a [`RollupStore`] as one [`ChangeSet`]. The store also
//! hosts the [`TransactionQueue`], so a cut records its batch and drains the
//! transfers it consumed in the same commit.
#![forbid(unsafe_code)]

mod change_set;
mod memory;
pub mod schema;
mod sqlite;
mod traits;

pub use change_set::ChangeSet;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{QueuedTransaction, RollupStore, TransactionQueue};
