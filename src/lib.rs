//! Lavarage lender dashboard: client-side data synchronization
//!
//! Architecture:
//! - `api`: remote lender endpoints behind the `LenderBackend` trait
//! - `sync`: cached offers, positions, pool balance and liquidation proceeds
//! - `wallet`: connection state over a wallet provider
//! - `onboarding`: welcome flow and risk disclosure persistence
//! - `context`: owns one of each container per application instance

pub mod api;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod format;
pub mod onboarding;
pub mod sync;
pub mod wallet;

pub use config::Config;
pub use context::AppContext;
