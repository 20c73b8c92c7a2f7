//! Binary merkle commitments over batch transactions.
//!
//! Internal nodes hash their two children in sorted order, so a proof is just
//! the list of siblings from the leaf level up. A node without a partner at
//! its level is paired with itself.
#![forbid(unsafe_code)]

mod merkle;

pub use merkle::*;
