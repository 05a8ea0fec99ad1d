//! Static reference data for the lender dashboard
//!
//! - Token tables (Solana, BSC)
//! - Supported chains
//! - Lender API path table
//! - Default thresholds
//! - Status enumerations shared by the data model

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a token the dashboard knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub decimals: u8,
    pub logo_uri: Option<&'static str>,
}

// ============================================
// SOLANA TOKENS
// ============================================

pub const SOL: Token = Token {
    symbol: "SOL",
    name: "Solana",
    address: "So11111111111111111111111111111111111111112",
    decimals: 9,
    logo_uri: Some("https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/So11111111111111111111111111111111111111112/logo.png"),
};

pub const USDC: Token = Token {
    symbol: "USDC",
    name: "USD Coin",
    address: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    decimals: 6,
    logo_uri: Some("https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v/logo.png"),
};

pub const USDT: Token = Token {
    symbol: "USDT",
    name: "Tether USD",
    address: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
    decimals: 6,
    logo_uri: Some("https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB/logo.png"),
};

pub const BTC: Token = Token {
    symbol: "BTC",
    name: "Bitcoin (Portal)",
    address: "9n4nbM75f5Ui33ZbPYXn59EwSgE8CGsHtAeTH5YFeJ9E",
    decimals: 8,
    logo_uri: Some("https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/9n4nbM75f5Ui33ZbPYXn59EwSgE8CGsHtAeTH5YFeJ9E/logo.png"),
};

pub const ETH: Token = Token {
    symbol: "ETH",
    name: "Ethereum (Portal)",
    address: "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
    decimals: 8,
    logo_uri: Some("https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs/logo.png"),
};

pub fn solana_tokens() -> Vec<Token> {
    vec![SOL, USDC, USDT, BTC, ETH]
}

// ============================================
// BSC TOKENS
// ============================================

pub fn bsc_tokens() -> Vec<Token> {
    vec![
        Token {
            symbol: "BNB",
            name: "BNB",
            address: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c",
            decimals: 18,
            logo_uri: None,
        },
        Token {
            symbol: "USDT",
            name: "Tether USD",
            address: "0x55d398326f99059fF775485246999027B3197955",
            decimals: 18,
            logo_uri: None,
        },
        Token {
            symbol: "USDC",
            name: "USD Coin",
            address: "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d",
            decimals: 18,
            logo_uri: None,
        },
    ]
}

// ============================================
// CHAINS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Solana,
    Bsc,
}

impl Chain {
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Solana => "Solana Mainnet",
            Chain::Bsc => "BNB Smart Chain",
        }
    }

    /// EVM chain id (Solana has none)
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Chain::Solana => None,
            Chain::Bsc => Some(56),
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Chain::Solana => "https://api.mainnet-beta.solana.com",
            Chain::Bsc => "https://bsc-dataseed.binance.org",
        }
    }

    pub fn tokens(&self) -> Vec<Token> {
        match self {
            Chain::Solana => solana_tokens(),
            Chain::Bsc => bsc_tokens(),
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Solana => write!(f, "solana"),
            Chain::Bsc => write!(f, "bsc"),
        }
    }
}

pub const SUPPORTED_CHAINS: [Chain; 2] = [Chain::Solana, Chain::Bsc];

lazy_static! {
    /// Solana tokens keyed by mint address
    static ref SOLANA_BY_ADDRESS: HashMap<&'static str, Token> = solana_tokens()
        .into_iter()
        .map(|t| (t.address, t))
        .collect();
}

/// Look up a Solana token by mint address
pub fn token_by_address(address: &str) -> Option<Token> {
    SOLANA_BY_ADDRESS.get(address).copied()
}

/// Look up a token by symbol on a chain (case-insensitive)
pub fn token_by_symbol(chain: Chain, symbol: &str) -> Option<Token> {
    chain
        .tokens()
        .into_iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

// ============================================
// API ENDPOINTS
// ============================================

/// HTTP method used by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

/// Lender API path table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiEndpoint {
    LenderOffers,
    LenderPositions,
    LenderPoolBalance,
    CreateOffer,
    UpdateOffer,
    ChangeLtv,
    Deposit,
    Withdraw,
    /// Only called when the liquidation source is `api`
    LiquidationProceeds,
}

impl ApiEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ApiEndpoint::LenderOffers => "/api/sdk/v1.0/lender/offers",
            ApiEndpoint::LenderPositions => "/api/sdk/v1.0/lender/positions",
            ApiEndpoint::LenderPoolBalance => "/api/sdk/v1.0/lender/pools/balance",
            ApiEndpoint::CreateOffer => "/api/sdk/v1.0/lender/offers/create",
            ApiEndpoint::UpdateOffer => "/api/sdk/v1.0/lender/offers/update",
            ApiEndpoint::ChangeLtv => "/api/sdk/v1.0/lender/offers/changeLTV",
            ApiEndpoint::Deposit => "/api/sdk/v1.0/lender/pools/deposit",
            ApiEndpoint::Withdraw => "/api/sdk/v1.0/lender/pools/withdraw",
            ApiEndpoint::LiquidationProceeds => "/api/sdk/v1.0/lender/liquidations",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            ApiEndpoint::LenderOffers
            | ApiEndpoint::LenderPositions
            | ApiEndpoint::LenderPoolBalance
            | ApiEndpoint::LiquidationProceeds => HttpMethod::Get,
            ApiEndpoint::CreateOffer | ApiEndpoint::Deposit | ApiEndpoint::Withdraw => {
                HttpMethod::Post
            }
            ApiEndpoint::UpdateOffer | ApiEndpoint::ChangeLtv => HttpMethod::Put,
        }
    }
}

// ============================================
// DEFAULTS
// ============================================

pub mod defaults {
    /// Dashboard refresh interval (seconds)
    pub const REFRESH_INTERVAL_SECS: u64 = 30;

    /// 5% in basis points
    pub const DEFAULT_SLIPPAGE_BPS: u32 = 500;

    pub const DEFAULT_LEVERAGE: u32 = 2;

    pub const MIN_INTEREST_RATE: u32 = 1;
    pub const MAX_INTEREST_RATE: u32 = 1000;

    pub const DEFAULT_QUOTE_TOKEN: &str = super::SOL.address;

    pub const API_BASE_URL: &str = "https://api.lavarage.com";

    /// Upper bound for the risk acknowledgment window (100 years)
    pub const MAX_RISK_ACK_VALIDITY_DAYS: i64 = 36_500;
}

// ============================================
// STATUS ENUMERATIONS
// ============================================

/// Server-side lifecycle of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Active,
    Closed,
    Liquidated,
    Repaid,
    Sold,
    #[serde(other)]
    Unknown,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Active => "active",
            PositionStatus::Closed => "closed",
            PositionStatus::Liquidated => "liquidated",
            PositionStatus::Repaid => "repaid",
            PositionStatus::Sold => "sold",
            PositionStatus::Unknown => "unknown",
        }
    }

    /// Case-insensitive; anything unrecognised is `Unknown`
    pub fn from_api(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "active" => PositionStatus::Active,
            "closed" => PositionStatus::Closed,
            "liquidated" => PositionStatus::Liquidated,
            "repaid" => PositionStatus::Repaid,
            "sold" => PositionStatus::Sold,
            _ => PositionStatus::Unknown,
        }
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Active,
    Inactive,
}

impl OfferStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            OfferStatus::Active
        } else {
            OfferStatus::Inactive
        }
    }
}

/// Settlement progress of a liquidation proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Cooldown,
    Processing,
    Deposited,
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStatus::Cooldown => write!(f, "cooldown"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Deposited => write!(f, "deposited"),
        }
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cooldown" => Ok(ProcessingStatus::Cooldown),
            "processing" => Ok(ProcessingStatus::Processing),
            "deposited" => Ok(ProcessingStatus::Deposited),
            other => Err(format!("unknown processing status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lookup() {
        let sol = token_by_address("So11111111111111111111111111111111111111112").unwrap();
        assert_eq!(sol.symbol, "SOL");
        assert_eq!(sol.decimals, 9);

        let usdc = token_by_symbol(Chain::Bsc, "usdc").unwrap();
        assert_eq!(usdc.decimals, 18);
        assert!(token_by_address("not-a-mint").is_none());
    }

    #[test]
    fn test_endpoint_table() {
        assert_eq!(ApiEndpoint::ChangeLtv.path(), "/api/sdk/v1.0/lender/offers/changeLTV");
        assert_eq!(ApiEndpoint::UpdateOffer.method(), HttpMethod::Put);
        assert_eq!(ApiEndpoint::Withdraw.method(), HttpMethod::Post);
        assert_eq!(ApiEndpoint::LenderPoolBalance.method(), HttpMethod::Get);
    }

    #[test]
    fn test_unknown_position_status_decodes() {
        let status: PositionStatus = serde_json::from_str("\"frozen\"").unwrap();
        assert_eq!(status, PositionStatus::Unknown);
        let status: PositionStatus = serde_json::from_str("\"repaid\"").unwrap();
        assert_eq!(status, PositionStatus::Repaid);
        assert_eq!(PositionStatus::from_api("Sold"), PositionStatus::Sold);
        assert_eq!(PositionStatus::from_api("pending"), PositionStatus::Unknown);
    }

    #[test]
    fn test_default_quote_token_is_sol() {
        assert_eq!(defaults::DEFAULT_QUOTE_TOKEN, SOL.address);
        assert_eq!(Chain::Bsc.chain_id(), Some(56));
    }
}
