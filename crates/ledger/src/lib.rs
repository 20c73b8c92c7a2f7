//! Layer-2 balances keyed by `(address, settlement domain)`.
//!
//! Mutations are computed on a [`StagedLedger`] and only become visible once
//! the resulting [`LedgerChange`] is committed, so callers can persist a change
//! before applying it and drop it on any failure.
#![forbid(unsafe_code)]

mod delta;
mod ledger;
mod staged;

pub use delta::*;
pub use ledger::*;
pub use staged::*;
