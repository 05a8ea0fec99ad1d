//! Derived views over the cached snapshots
//!
//! Pure projections: they own nothing and are recomputed from whatever
//! snapshot they are handed.

use serde::Serialize;

use super::resource::LoadingFlags;
use crate::api::{Offer, PoolBalance, Position};
use crate::format::calculate_utilization_rate;

/// Number of offers with the active flag set
pub fn total_active_offers(offers: &[Offer]) -> usize {
    offers.iter().filter(|o| o.active).count()
}

/// Sum of `maxExposure`; missing or unparseable values count as zero
pub fn total_liquidity(offers: &[Offer]) -> f64 {
    offers.iter().map(Offer::max_exposure_value).sum()
}

/// Sum of `currentExposure`; missing or unparseable values count as zero
pub fn total_utilization(offers: &[Offer]) -> f64 {
    offers.iter().map(Offer::current_exposure_value).sum()
}

/// Positions with status `active`, in snapshot order
pub fn active_positions(positions: &[Position]) -> Vec<Position> {
    positions.iter().filter(|p| p.is_active()).cloned().collect()
}

/// Book-wide utilization percentage
pub fn overall_utilization_rate(offers: &[Offer]) -> f64 {
    calculate_utilization_rate(total_utilization(offers), total_liquidity(offers))
}

/// Everything the dashboard header shows, in one serializable value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LenderSummary {
    pub total_offers: usize,
    pub total_active_offers: usize,
    pub total_liquidity: f64,
    pub total_utilization: f64,
    pub utilization_rate: f64,
    pub total_positions: usize,
    pub active_positions: usize,
    pub pool_balance: Option<PoolBalance>,
    pub liquidation_count: usize,
    pub loading: LoadingFlags,
    pub error: Option<String>,
}
