//! Runtime configuration for the lender sync client
//!
//! Loaded from the environment (with `.env` support) or a TOML file.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::api::sample::STUB_DELAY_MS;
use crate::api::LiquidationSource;
use crate::constants::defaults;
use crate::sync::StalePolicy;

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Remote API ==========
    /// Base URL of the Lavarage API; endpoint paths are appended to it
    pub api_base_url: String,

    /// Sent as `x-api-key` on every request
    pub api_key: Option<String>,

    /// Per-request timeout; expiry surfaces as a network error
    pub request_timeout_secs: u64,

    // ========== Lender ==========
    /// Wallet used when none is connected explicitly
    pub wallet_address: Option<String>,

    /// Quote token mint for pool balance lookups
    pub quote_token: String,

    /// Interval for `watch`
    pub refresh_interval_secs: u64,

    // ========== Sync Behaviour ==========
    pub liquidation_source: LiquidationSource,

    /// Simulated latency of stub liquidation data
    pub stub_delay_ms: u64,

    pub stale_policy: StalePolicy,

    // ========== Onboarding ==========
    pub storage_path: String,
    pub storage_prefix: String,
    pub welcome_delay_ms: u64,
    pub risk_ack_validity_days: i64,
}

/// Read `key` and parse it, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let fallback = Self::default();

        Ok(Self {
            // Remote API
            api_base_url: env::var("LAVARAGE_API_URL").unwrap_or(fallback.api_base_url),
            api_key: env_opt("LAVARAGE_API_KEY"),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", fallback.request_timeout_secs),

            // Lender
            wallet_address: env_opt("LENDER_WALLET"),
            quote_token: env_opt("QUOTE_TOKEN").unwrap_or(fallback.quote_token),
            refresh_interval_secs: env_or("REFRESH_INTERVAL_SECS", fallback.refresh_interval_secs),

            // Sync behaviour
            liquidation_source: env_or("LIQUIDATION_SOURCE", fallback.liquidation_source),
            stub_delay_ms: env_or("STUB_DELAY_MS", fallback.stub_delay_ms),
            stale_policy: env_or("STALE_POLICY", fallback.stale_policy),

            // Onboarding
            storage_path: env_opt("STORAGE_PATH").unwrap_or(fallback.storage_path),
            storage_prefix: env_opt("STORAGE_PREFIX").unwrap_or(fallback.storage_prefix),
            welcome_delay_ms: env_or("WELCOME_DELAY_MS", fallback.welcome_delay_ms),
            risk_ack_validity_days: env_or("RISK_ACK_VALIDITY_DAYS", fallback.risk_ack_validity_days),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(eyre!(
                "Invalid LAVARAGE_API_URL {:?} - expected an http(s) URL",
                self.api_base_url
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(eyre!("REQUEST_TIMEOUT_SECS must be greater than 0"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(eyre!("REFRESH_INTERVAL_SECS must be greater than 0"));
        }
        if self.risk_ack_validity_days <= 0
            || self.risk_ack_validity_days > defaults::MAX_RISK_ACK_VALIDITY_DAYS
        {
            return Err(eyre!(
                "RISK_ACK_VALIDITY_DAYS must be between 1 and {} (currently {})",
                defaults::MAX_RISK_ACK_VALIDITY_DAYS,
                self.risk_ack_validity_days
            ));
        }
        if self.storage_prefix.is_empty() {
            return Err(eyre!("STORAGE_PREFIX must not be empty"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let set_or = |v: &Option<String>, missing: &str| {
            v.as_ref().map(|_| "✓ Configured".to_string()).unwrap_or_else(|| missing.to_string())
        };
        let wallet = self
            .wallet_address
            .as_deref()
            .map(|w| crate::format::format_address(w, 6, 4))
            .unwrap_or_else(|| "✗ Not Set".to_string());

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║             LAVARAGE LENDER - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ REMOTE API                                                 ║");
        println!("║ • Base URL:        {:^40} ║", crate::format::truncate_text(&self.api_base_url, 40));
        println!("║ • API Key:         {:^40} ║", set_or(&self.api_key, "✗ Not Set"));
        println!("║ • Timeout:         {:>38} s ║", self.request_timeout_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ LENDER                                                     ║");
        println!("║ • Wallet:          {:^40} ║", wallet);
        println!("║ • Quote Token:     {:^40} ║", crate::format::format_address(&self.quote_token, 6, 4));
        println!("║ • Refresh:         {:>38} s ║", self.refresh_interval_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SYNC                                                       ║");
        println!("║ • Liquidations:    {:^40} ║", self.liquidation_source);
        println!("║ • Stale Policy:    {:^40} ║", self.stale_policy);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ONBOARDING                                                 ║");
        println!("║ • Storage:         {:^40} ║", crate::format::truncate_text(&self.storage_path, 40));
        println!("║ • Key Prefix:      {:^40} ║", self.storage_prefix);
        println!("║ • Risk Ack Valid:  {:>35} days ║", self.risk_ack_validity_days);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: defaults::API_BASE_URL.to_string(),
            api_key: None,
            request_timeout_secs: 30,
            wallet_address: None,
            quote_token: defaults::DEFAULT_QUOTE_TOKEN.to_string(),
            refresh_interval_secs: defaults::REFRESH_INTERVAL_SECS,
            liquidation_source: LiquidationSource::Stub,
            stub_delay_ms: STUB_DELAY_MS,
            stale_policy: StalePolicy::LatestIssued,
            storage_path: "./.lavarage/storage.json".to_string(),
            storage_prefix: "lavarage".to_string(),
            welcome_delay_ms: 1000,
            risk_ack_validity_days: 30,
        }
    }
}
