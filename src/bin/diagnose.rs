//! Diagnostic tool - Check configuration and storage
//!
//! Run with: cargo run --bin diagnose

use std::env;
use std::path::Path;

use lavarage_lender::api::LiquidationSource;
use lavarage_lender::Config;

fn main() {
    println!("🔍 LAVARAGE LENDER DIAGNOSTIC CHECK\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Failed to load configuration: {}", e);
            return;
        }
    };

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("LAVARAGE_API_URL", "Lavarage API base URL"),
        ("REQUEST_TIMEOUT_SECS", "Per-request timeout"),
        ("QUOTE_TOKEN", "Quote token for pool balances"),
        ("REFRESH_INTERVAL_SECS", "Seconds between refreshes in watch mode"),
        ("LIQUIDATION_SOURCE", "stub (sample data) or api"),
        ("STALE_POLICY", "latest_issued or last_arrival"),
        ("STORAGE_PATH", "Onboarding storage file"),
        ("RISK_ACK_VALIDITY_DAYS", "Days a risk acknowledgment stays valid"),
    ];

    for (key, desc) in checks {
        let marker = if env::var(key).is_ok() { "(from .env)" } else { "(default)" };
        let value = match key {
            "LAVARAGE_API_URL" => config.api_base_url.clone(),
            "REQUEST_TIMEOUT_SECS" => config.request_timeout_secs.to_string(),
            "QUOTE_TOKEN" => config.quote_token.clone(),
            "REFRESH_INTERVAL_SECS" => config.refresh_interval_secs.to_string(),
            "LIQUIDATION_SOURCE" => config.liquidation_source.to_string(),
            "STALE_POLICY" => config.stale_policy.to_string(),
            "STORAGE_PATH" => config.storage_path.clone(),
            _ => config.risk_ack_validity_days.to_string(),
        };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                    CREDENTIALS                     ");
    println!("═══════════════════════════════════════════════════\n");

    let set = |present: bool| if present { "✅ Set" } else { "❌ Not set" };
    println!("  LAVARAGE_API_KEY: {}", set(config.api_key.is_some()));
    println!("  LENDER_WALLET:    {}", set(config.wallet_address.is_some()));
    println!(
        "  Storage file:     {}",
        if Path::new(&config.storage_path).exists() { "✅ Exists" } else { "➖ Created on first write" }
    );

    println!("\n═══════════════════════════════════════════════════");
    println!("                     STATUS                         ");
    println!("═══════════════════════════════════════════════════\n");

    config.print_summary();
    println!();

    match config.validate() {
        Ok(()) => println!("  ✅ Configuration is valid"),
        Err(e) => println!("  ❌ {}", e),
    }

    if config.liquidation_source == LiquidationSource::Stub {
        println!("\n  ⚠️  Liquidation proceeds are STUB sample data.");
        println!("     Set LIQUIDATION_SOURCE=api once the endpoint is live.");
    }
    if config.wallet_address.is_none() {
        println!("\n  ⚠️  No LENDER_WALLET - pass --wallet to each command.");
    }

    println!("\n✅ Diagnostic complete!\n");
}
