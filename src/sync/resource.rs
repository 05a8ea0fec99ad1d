//! Resource kinds, loading flags and request sequencing

use serde::{Deserialize, Serialize};

/// The independently synchronized slices of lender state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Offers,
    Positions,
    PoolBalance,
    LiquidationProceeds,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Offers,
        ResourceKind::Positions,
        ResourceKind::PoolBalance,
        ResourceKind::LiquidationProceeds,
    ];

    fn index(&self) -> usize {
        match self {
            ResourceKind::Offers => 0,
            ResourceKind::Positions => 1,
            ResourceKind::PoolBalance => 2,
            ResourceKind::LiquidationProceeds => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Offers => "lender offers",
            ResourceKind::Positions => "lender positions",
            ResourceKind::PoolBalance => "pool balance",
            ResourceKind::LiquidationProceeds => "liquidation proceeds",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One loading flag per resource kind, toggled independently
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFlags {
    pub offers: bool,
    pub positions: bool,
    pub pool_balance: bool,
    pub liquidation_proceeds: bool,
}

impl LoadingFlags {
    pub fn get(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Offers => self.offers,
            ResourceKind::Positions => self.positions,
            ResourceKind::PoolBalance => self.pool_balance,
            ResourceKind::LiquidationProceeds => self.liquidation_proceeds,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, value: bool) {
        match kind {
            ResourceKind::Offers => self.offers = value,
            ResourceKind::Positions => self.positions = value,
            ResourceKind::PoolBalance => self.pool_balance = value,
            ResourceKind::LiquidationProceeds => self.liquidation_proceeds = value,
        }
    }

    pub fn any(&self) -> bool {
        ResourceKind::ALL.iter().any(|k| self.get(*k))
    }
}

/// What to do with a response that is not the newest request for its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Drop responses superseded by a later request
    #[default]
    LatestIssued,
    /// Apply every response; whichever lands last wins
    LastArrival,
}

impl std::fmt::Display for StalePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StalePolicy::LatestIssued => write!(f, "latest_issued"),
            StalePolicy::LastArrival => write!(f, "last_arrival"),
        }
    }
}

impl std::str::FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest_issued" | "latest" => Ok(StalePolicy::LatestIssued),
            "last_arrival" | "legacy" => Ok(StalePolicy::LastArrival),
            other => Err(format!("unknown stale policy: {}", other)),
        }
    }
}

/// Ticket handed to a fetch when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub kind: ResourceKind,
    pub seq: u64,
}

/// Monotonic request counter per resource kind
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: [u64; 4],
}

impl RequestSequencer {
    pub fn issue(&mut self, kind: ResourceKind) -> RequestToken {
        let slot = &mut self.issued[kind.index()];
        *slot += 1;
        RequestToken { kind, seq: *slot }
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.issued[token.kind.index()] == token.seq
    }
}
