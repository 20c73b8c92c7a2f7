//! Types shared by every glide crate: transactions, batches, challenges
//! and the identifiers that tie them together.
#![forbid(unsafe_code)]

mod batch;
mod challenge;
mod constants;
mod transaction;
pub mod types;

pub use batch::*;
pub use challenge::*;
pub use constants::*;
pub use transaction::*;
pub use types::*;
