//! Client-side data synchronization for lender state
//!
//! Fetches, caches and derives aggregate views over the active wallet's
//! offers, positions, pool balance and liquidation proceeds.

pub mod aggregates;
mod lender;
mod resource;

pub use aggregates::LenderSummary;
pub use lender::{LenderState, LenderStore};
pub use resource::{LoadingFlags, RequestSequencer, RequestToken, ResourceKind, StalePolicy};
