//! Remote lender API
//!
//! `LenderBackend` is the seam the sync layer talks to. `LenderApi` is the
//! reqwest implementation; tests plug in scripted backends.

mod client;
pub mod sample;
pub mod types;

pub use client::LenderApi;
pub use types::{
    amount_or_zero, LiquidationProceed, Offer, PoolBalance, Position, PositionFilter, Scalar,
    TokenInfo,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::ApiEndpoint;
use crate::error::ApiError;

/// Where liquidation proceeds come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationSource {
    /// Fixed sample records (no server endpoint exists yet)
    #[default]
    Stub,
    /// `GET /api/sdk/v1.0/lender/liquidations`
    Api,
}

impl std::fmt::Display for LiquidationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiquidationSource::Stub => write!(f, "STUB (sample data)"),
            LiquidationSource::Api => write!(f, "API"),
        }
    }
}

impl std::str::FromStr for LiquidationSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stub" | "sample" | "mock" => Ok(LiquidationSource::Stub),
            "api" => Ok(LiquidationSource::Api),
            other => Err(format!("unknown liquidation source: {}", other)),
        }
    }
}

/// Everything the sync layer needs from the remote API
#[async_trait]
pub trait LenderBackend: Send + Sync {
    async fn lender_offers(&self, wallet: &str) -> Result<Vec<Offer>, ApiError>;

    async fn lender_positions(
        &self,
        wallet: &str,
        filter: PositionFilter,
    ) -> Result<Vec<Position>, ApiError>;

    async fn pool_balance(&self, wallet: &str, quote_token: &str) -> Result<PoolBalance, ApiError>;

    async fn liquidation_proceeds(&self, wallet: &str) -> Result<Vec<LiquidationProceed>, ApiError>;

    /// Send a JSON body to a mutation endpoint and return the decoded reply
    async fn mutate(&self, endpoint: ApiEndpoint, body: Value) -> Result<Value, ApiError>;

    fn liquidation_source(&self) -> LiquidationSource {
        LiquidationSource::Api
    }
}
