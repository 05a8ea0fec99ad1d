//! Lender API data model
//!
//! Amounts travel as decimal strings in the smallest token unit. The API is
//! not strict about that, so amount fields also accept JSON numbers. Fields
//! we do not model are kept in `extra` so a decoded snapshot still carries
//! the whole payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::constants::{PositionStatus, ProcessingStatus};
use crate::format::{calculate_utilization_rate, parse_decimal, parse_timestamp};

// ============================================
// FIELD HELPERS
// ============================================

/// String-or-number field, kept in the form the server sent it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Text(s) => parse_decimal(s),
            Scalar::Number(n) => n.as_f64(),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Text(String::new())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Scalar::Text(s),
            Value::Number(n) => Scalar::Number(n),
            Value::Null => Scalar::default(),
            other => Scalar::Text(other.to_string()),
        })
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

impl PartialEq<str> for Scalar {
    fn eq(&self, other: &str) -> bool {
        match self {
            Scalar::Text(s) => s == other,
            Scalar::Number(n) => n.to_string() == other,
        }
    }
}

impl PartialEq<&str> for Scalar {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// `null` reads as `false`
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Identifiers are strings, but tolerate numeric ids
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(|v| v.to_string())
        .unwrap_or_default())
}

/// Parse an amount field, treating missing or unparseable values as zero
pub fn amount_or_zero(value: Option<&str>) -> f64 {
    value.and_then(parse_decimal).unwrap_or(0.0)
}

fn scalar_or_zero(value: Option<&Scalar>) -> f64 {
    value.and_then(Scalar::as_f64).unwrap_or(0.0)
}

// ============================================
// TOKENS
// ============================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenInfo {
    pub fn new(symbol: &str, name: &str, address: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            ..Default::default()
        }
    }
}

// ============================================
// OFFERS
// ============================================

/// A lender's published terms
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default)]
    pub id: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_wallet: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_exposure: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_exposure: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_token: Option<TokenInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Offer {
    pub fn max_exposure_value(&self) -> f64 {
        scalar_or_zero(self.max_exposure.as_ref())
    }

    pub fn current_exposure_value(&self) -> f64 {
        scalar_or_zero(self.current_exposure.as_ref())
    }

    pub fn interest_rate_value(&self) -> f64 {
        scalar_or_zero(self.interest_rate.as_ref())
    }

    /// Utilization of this offer as a percentage
    pub fn utilization_rate(&self) -> f64 {
        calculate_utilization_rate(self.current_exposure_value(), self.max_exposure_value())
    }

    /// `currentExposure > maxExposure`. The server guarantees this never
    /// happens; the client only reports it.
    pub fn exceeds_capacity(&self) -> bool {
        self.current_exposure_value() > self.max_exposure_value()
    }
}

// ============================================
// POSITIONS
// ============================================

/// A borrower's leveraged position against one of our offers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub id: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trader_wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_wallet: Option<String>,
    /// Raw status string; see `status()` for the typed view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_amount: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowed_amount: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<Scalar>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Position {
    pub fn new(id: &str, status: PositionStatus) -> Self {
        Self {
            id: id.into(),
            trader_wallet: None,
            lender_wallet: None,
            status: Some(status.as_str().to_string()),
            collateral_amount: None,
            collateral_token: None,
            borrowed_amount: None,
            leverage: None,
            extra: Map::new(),
        }
    }

    /// Unrecognised or missing statuses map to `Unknown`
    pub fn status(&self) -> PositionStatus {
        self.status
            .as_deref()
            .map(PositionStatus::from_api)
            .unwrap_or(PositionStatus::Unknown)
    }

    pub fn is_active(&self) -> bool {
        self.status() == PositionStatus::Active
    }
}

/// Status filter for the positions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionFilter {
    #[default]
    All,
    Status(PositionStatus),
}

impl PositionFilter {
    pub fn as_query(&self) -> &'static str {
        match self {
            PositionFilter::All => "all",
            PositionFilter::Status(status) => status.as_str(),
        }
    }
}

impl std::fmt::Display for PositionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

impl std::str::FromStr for PositionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s.trim().to_lowercase().as_str(), "all" | "") {
            return Ok(PositionFilter::All);
        }
        match PositionStatus::from_api(s) {
            PositionStatus::Unknown => Err(format!("unknown position status: {}", s)),
            status => Ok(PositionFilter::Status(status)),
        }
    }
}

// ============================================
// POOL BALANCE
// ============================================

/// Point-in-time balance for a (wallet, quote token) pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBalance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_token: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Scalar>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PoolBalance {
    pub fn balance_value(&self) -> f64 {
        scalar_or_zero(self.balance.as_ref())
    }
}

// ============================================
// LIQUIDATION PROCEEDS
// ============================================

/// Settlement record of a force-closed position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationProceed {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub position_address: String,
    pub liquidated_at: String,
    #[serde(default, deserialize_with = "de_id")]
    pub collateral_amount: String,
    pub collateral_token: TokenInfo,
    #[serde(default, deserialize_with = "de_id")]
    pub sold_for: String,
    #[serde(default, deserialize_with = "de_id")]
    pub pnl: String,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_end_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LiquidationProceed {
    pub fn pnl_value(&self) -> f64 {
        amount_or_zero(Some(self.pnl.as_str()))
    }

    pub fn is_profit(&self) -> bool {
        self.pnl_value() > 0.0
    }

    /// Seconds left in cooldown, `None` when not cooling down or no end time
    pub fn cooldown_remaining_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.processing_status != ProcessingStatus::Cooldown {
            return None;
        }
        let end = self.cooldown_end_time.as_deref().and_then(parse_timestamp)?;
        Some((end - now).num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_accepts_numeric_and_string_amounts() {
        let offer: Offer = serde_json::from_value(json!({
            "id": 7,
            "active": true,
            "maxExposure": "100",
            "currentExposure": 40,
            "interestRate": 12,
            "nodeWallet": "abc"
        }))
        .unwrap();

        assert_eq!(offer.id, "7");
        assert_eq!(offer.max_exposure_value(), 100.0);
        assert_eq!(offer.current_exposure_value(), 40.0);
        assert_eq!(offer.utilization_rate(), 40.0);
        assert!(!offer.exceeds_capacity());
        assert_eq!(offer.extra.get("nodeWallet"), Some(&json!("abc")));
    }

    #[test]
    fn test_offer_roundtrip_keeps_unmodelled_fields() {
        let raw = json!({
            "id": "o1",
            "active": false,
            "maxExposure": "5",
            "rawData": { "bump": 254 }
        });
        let offer: Offer = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&offer).unwrap(), raw);
    }

    #[test]
    fn test_numeric_fields_serialize_as_numbers() {
        let raw = json!({
            "id": 7,
            "active": true,
            "maxExposure": 100,
            "currentExposure": "25",
            "interestRate": 12.5
        });
        let offer: Offer = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(offer.id, Scalar::from(7u64));
        assert_eq!(serde_json::to_value(&offer).unwrap(), raw);
    }

    #[test]
    fn test_null_flag_and_status_do_not_reject_snapshot() {
        let offers: Vec<Offer> = serde_json::from_value(json!([
            { "id": "o1", "active": null, "maxExposure": "100" },
            { "id": "o2", "active": true, "maxExposure": null }
        ]))
        .unwrap();
        assert!(!offers[0].active);
        assert_eq!(offers[0].max_exposure_value(), 100.0);
        assert_eq!(offers[1].max_exposure, None);

        let positions: Vec<Position> = serde_json::from_value(json!([
            { "id": "p1", "status": null },
            { "id": "p2", "status": "ACTIVE" }
        ]))
        .unwrap();
        assert_eq!(positions[0].status(), PositionStatus::Unknown);
        assert!(positions[1].is_active());
    }

    #[test]
    fn test_unrecognised_position_status_survives_roundtrip() {
        let raw = json!({ "id": "p1", "status": "pending", "borrowedAmount": 1500 });
        let position: Position = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(position.status(), PositionStatus::Unknown);
        assert!(!position.is_active());
        assert_eq!(serde_json::to_value(&position).unwrap(), raw);
    }

    #[test]
    fn test_position_filter_parsing() {
        assert_eq!("all".parse::<PositionFilter>().unwrap(), PositionFilter::All);
        assert_eq!(
            "Liquidated".parse::<PositionFilter>().unwrap(),
            PositionFilter::Status(PositionStatus::Liquidated)
        );
        assert!("pending".parse::<PositionFilter>().is_err());
        assert_eq!(PositionFilter::default().as_query(), "all");
    }

    #[test]
    fn test_cooldown_remaining() {
        let now = parse_timestamp("2024-12-01T10:00:00Z").unwrap();
        let proceed: LiquidationProceed = serde_json::from_value(json!({
            "id": "1",
            "positionAddress": "pos",
            "liquidatedAt": "2024-12-01T09:00:00Z",
            "collateralAmount": "2500000000",
            "collateralToken": { "symbol": "SOL", "name": "Solana" },
            "soldFor": "2200000000",
            "pnl": "-300000000",
            "processingStatus": "cooldown",
            "cooldownEndTime": "2024-12-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(proceed.cooldown_remaining_secs(now), Some(7200));
        assert!(!proceed.is_profit());
    }
}
