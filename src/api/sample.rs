//! STUB liquidation proceeds
//!
//! The lender API has no liquidation endpoint yet. Until it does, the client
//! can serve these fixed records after a short delay. Anything produced here
//! is sample data, never a real settlement.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Map;
use std::time::Duration;

use super::types::{LiquidationProceed, TokenInfo};
use crate::constants::{ProcessingStatus, BTC, ETH, SOL, USDC};

/// Default simulated network delay
pub const STUB_DELAY_MS: u64 = 500;

#[allow(clippy::too_many_arguments)]
fn record(
    id: &str,
    position_address: &str,
    liquidated_at: &str,
    collateral_amount: &str,
    token: TokenInfo,
    sold_for: &str,
    pnl: &str,
    status: ProcessingStatus,
    cooldown_end_time: Option<String>,
) -> LiquidationProceed {
    LiquidationProceed {
        id: id.to_string(),
        position_address: position_address.to_string(),
        liquidated_at: liquidated_at.to_string(),
        collateral_amount: collateral_amount.to_string(),
        collateral_token: token,
        sold_for: sold_for.to_string(),
        pnl: pnl.to_string(),
        processing_status: status,
        cooldown_end_time,
        extra: Map::new(),
    }
}

/// The fixed sample set. The cooldown record always ends two hours from now.
pub fn sample_liquidation_proceeds() -> Vec<LiquidationProceed> {
    let cooldown_end = (Utc::now() + ChronoDuration::hours(2)).to_rfc3339();

    vec![
        record(
            "1",
            "AezAHf5e6Cfiyyvu35KkWKEuZKLsEAN4XWzA36NvvCBw",
            "2024-12-01T10:30:00.000Z",
            "2500000000",
            TokenInfo::new(SOL.symbol, "Solana", SOL.address),
            "2200000000",
            "-300000000",
            ProcessingStatus::Cooldown,
            Some(cooldown_end),
        ),
        record(
            "2",
            "BfzXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
            "2024-11-28T15:45:00.000Z",
            "5000000000",
            TokenInfo::new(ETH.symbol, "Ethereum", ETH.address),
            "5100000000",
            "100000000",
            ProcessingStatus::Processing,
            None,
        ),
        record(
            "3",
            "CgzHTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
            "2024-11-25T09:20:00.000Z",
            "1000000000",
            TokenInfo::new(BTC.symbol, "Bitcoin", BTC.address),
            "980000000",
            "-20000000",
            ProcessingStatus::Deposited,
            None,
        ),
        record(
            "4",
            "DhzITUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
            "2024-11-20T14:15:00.000Z",
            "3200000000",
            TokenInfo::new(USDC.symbol, "USD Coin", USDC.address),
            "3350000000",
            "150000000",
            ProcessingStatus::Deposited,
            None,
        ),
    ]
}

/// Serve the sample set after `delay`
pub async fn stub_liquidation_proceeds(delay: Duration) -> Vec<LiquidationProceed> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    sample_liquidation_proceeds()
}
