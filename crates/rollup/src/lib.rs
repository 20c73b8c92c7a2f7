//! Optimistic rollup core: batch lifecycle, challenges and fraud assessment.
//!
//! A [`Rollup`] owns the in-core view of every batch, challenge and balance.
//! Each transition validates against that view, writes its effects through
//! the injected [`glide_db::RollupStore`] and only then updates memory, so a
//! failing collaborator never leaves a half-applied transition behind.
#![forbid(unsafe_code)]

mod challenge;
mod collaborators;
mod config;
mod error;
mod fraud;
mod lifecycle;
mod roles;
mod rollup;

pub use collaborators::*;
pub use config::*;
pub use error::RollupError;
pub use fraud::{ClaimAssessment, SemanticViolation};
pub use roles::RoleRegistry;
pub use rollup::{Collaborators, Rollup};
