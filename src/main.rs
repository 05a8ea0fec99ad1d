//! Lavarage Lender - command-line dashboard
//!
//! Run with: cargo run -- summary --wallet <ADDRESS>

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lavarage_lender::api::{LiquidationSource, PositionFilter, Scalar};
use lavarage_lender::constants::ProcessingStatus;
use lavarage_lender::format::{
    format_address, format_date, format_duration, format_number, format_percentage,
    format_time_ago, NumberFormat,
};
use lavarage_lender::sync::LenderSummary;
use lavarage_lender::{AppContext, Config};

// ============================================
// COMMAND DEFINITION
// ============================================

/// Lender dashboard for Lavarage: offers, positions, pool balance and liquidations
#[derive(Debug, Parser)]
#[command(name = "lavarage-lender", version, about)]
struct Cli {
    /// Lender wallet address (overrides LENDER_WALLET)
    #[arg(short, long, global = true)]
    wallet: Option<String>,

    /// TOML configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch everything and print the aggregate view
    Summary,

    /// List the wallet's offers
    Offers,

    /// List positions against the wallet's offers
    Positions {
        /// Status filter (all, active, closed, liquidated, repaid, sold)
        #[arg(long, default_value = "all")]
        status: PositionFilter,
    },

    /// Show the pool balance for a quote token
    Balance {
        /// Quote token mint (defaults to QUOTE_TOKEN)
        #[arg(long)]
        quote_token: Option<String>,
    },

    /// List liquidation proceeds
    Liquidations,

    /// Create an offer from a JSON payload
    CreateOffer {
        #[arg(long)]
        payload: PathBuf,
    },

    /// Update an offer from a JSON payload
    UpdateOffer {
        #[arg(long)]
        payload: PathBuf,
    },

    /// Change an offer's LTV from a JSON payload
    ChangeLtv {
        #[arg(long)]
        payload: PathBuf,
    },

    /// Build a deposit transaction from a JSON payload
    Deposit {
        #[arg(long)]
        payload: PathBuf,
    },

    /// Build a withdrawal transaction from a JSON payload
    Withdraw {
        #[arg(long)]
        payload: PathBuf,
    },

    /// Refresh periodically until interrupted
    Watch {
        /// Seconds between refreshes (defaults to REFRESH_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Inspect or change onboarding state
    Onboarding {
        #[command(subcommand)]
        action: OnboardingAction,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum OnboardingAction {
    Status,
    Complete,
    Skip,
    AckRisk,
    Reset,
}

// ============================================
// OUTPUT HELPERS
// ============================================

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🌋 LAVARAGE LENDER - Dashboard Sync").cyan().bold()
    );
    println!(
        "{}",
        style("    Offers | Positions | Pool Balance | Liquidations").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn create_spinner(message: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner} {msg}")
    {
        spinner.set_style(template);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn amount(value: Option<&str>) -> String {
    decimal(value.and_then(lavarage_lender::format::parse_decimal))
}

fn scalar(value: Option<&Scalar>) -> String {
    decimal(value.and_then(Scalar::as_f64))
}

fn decimal(value: Option<f64>) -> String {
    value
        .map(|v| format_number(v, &NumberFormat::fixed(2)))
        .unwrap_or_else(|| "-".to_string())
}

fn read_payload(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read payload {}", path.display()))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("Payload {} is not valid JSON", path.display()))
}

/// Fail when the last fetch recorded an error
async fn check_error(ctx: &AppContext) -> Result<()> {
    match ctx.lender().error().await {
        Some(message) => Err(eyre!(message)),
        None => Ok(()),
    }
}

async fn require_wallet(ctx: &AppContext) -> Result<String> {
    ctx.wallet()
        .address()
        .await
        .ok_or_else(|| eyre!("No wallet - pass --wallet or set LENDER_WALLET"))
}

fn print_summary(summary: &LenderSummary) {
    println!("{}", style("═══ LENDER SUMMARY ═══").blue().bold());
    println!("  Offers:            {} ({} active)", summary.total_offers, summary.total_active_offers);
    println!("  Total Liquidity:   {}", format_number(summary.total_liquidity, &NumberFormat::fixed(2)));
    println!("  Total Utilization: {}", format_number(summary.total_utilization, &NumberFormat::fixed(2)));
    println!("  Utilization Rate:  {}", format_percentage(summary.utilization_rate, 2));
    println!("  Positions:         {} ({} active)", summary.total_positions, summary.active_positions);
    println!(
        "  Pool Balance:      {}",
        scalar(summary.pool_balance.as_ref().and_then(|b| b.balance.as_ref()))
    );
    println!("  Liquidations:      {}", summary.liquidation_count);
    if let Some(ref message) = summary.error {
        println!("  {} {}", style("✗").red(), message);
    }
}

// ============================================
// COMMANDS
// ============================================

async fn run_summary(ctx: &AppContext, json: bool) -> Result<()> {
    require_wallet(ctx).await?;
    let spinner = create_spinner("Fetching lender data...", !json);
    let summary = ctx.refresh().await;
    spinner.finish_and_clear();

    if json {
        return print_json(&summary);
    }
    print_summary(&summary);
    if ctx.lender().liquidation_source() == LiquidationSource::Stub {
        println!("  {}", style("⚠ Liquidation data is STUB sample data").yellow());
    }
    Ok(())
}

async fn run_offers(ctx: &AppContext, json: bool) -> Result<()> {
    let wallet = require_wallet(ctx).await?;
    let spinner = create_spinner("Fetching offers...", !json);
    ctx.lender().fetch_offers(Some(wallet.as_str())).await;
    spinner.finish_and_clear();
    check_error(ctx).await?;

    let offers = ctx.lender().offers().await;
    if json {
        return print_json(&offers);
    }

    println!("{}", style(format!("═══ OFFERS ({}) ═══", offers.len())).blue().bold());
    for offer in &offers {
        let marker = if offer.active { style("●").green() } else { style("○").dim() };
        let collateral = offer
            .collateral_token
            .as_ref()
            .map(|t| t.symbol.clone())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {} {:<12} {:<8} max {:>14}  used {:>14}  util {:>8}  apr {}",
            marker,
            format_address(&offer.id.to_string(), 4, 4),
            collateral,
            scalar(offer.max_exposure.as_ref()),
            scalar(offer.current_exposure.as_ref()),
            format_percentage(offer.utilization_rate(), 1),
            format_percentage(offer.interest_rate_value(), 1),
        );
        if offer.exceeds_capacity() {
            warn!("Offer {} reports exposure above its maximum", offer.id);
        }
    }
    Ok(())
}

async fn run_positions(ctx: &AppContext, filter: PositionFilter, json: bool) -> Result<()> {
    let wallet = require_wallet(ctx).await?;
    let spinner = create_spinner("Fetching positions...", !json);
    ctx.lender().fetch_positions(Some(wallet.as_str()), filter).await;
    spinner.finish_and_clear();
    check_error(ctx).await?;

    let positions = ctx.lender().positions().await;
    if json {
        return print_json(&positions);
    }

    println!(
        "{}",
        style(format!("═══ POSITIONS [{}] ({}) ═══", filter, positions.len())).blue().bold()
    );
    for position in &positions {
        let trader = position
            .trader_wallet
            .as_deref()
            .map(|w| format_address(w, 4, 4))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {:<10} trader {:<12} borrowed {:>14}  collateral {:>14}",
            format_address(&position.id.to_string(), 4, 4),
            position.status(),
            trader,
            scalar(position.borrowed_amount.as_ref()),
            scalar(position.collateral_amount.as_ref()),
        );
    }
    Ok(())
}

async fn run_balance(ctx: &AppContext, quote_token: Option<String>, json: bool) -> Result<()> {
    let wallet = require_wallet(ctx).await?;
    let quote = quote_token.unwrap_or_else(|| ctx.config().quote_token.clone());

    let spinner = create_spinner("Fetching pool balance...", !json);
    ctx.lender().fetch_pool_balance(Some(wallet.as_str()), Some(quote.as_str())).await;
    spinner.finish_and_clear();
    check_error(ctx).await?;

    let balance = ctx.lender().pool_balance().await;
    if json {
        return print_json(&balance);
    }

    let symbol = lavarage_lender::constants::token_by_address(&quote)
        .map(|t| t.symbol.to_string())
        .unwrap_or_else(|| format_address(&quote, 4, 4));
    println!(
        "{} Pool balance ({}): {}",
        style("✓").green(),
        symbol,
        scalar(balance.as_ref().and_then(|b| b.balance.as_ref()))
    );
    Ok(())
}

async fn run_liquidations(ctx: &AppContext, json: bool) -> Result<()> {
    let wallet = require_wallet(ctx).await?;
    let spinner = create_spinner("Fetching liquidation proceeds...", !json);
    ctx.lender().fetch_liquidation_proceeds(Some(wallet.as_str())).await;
    spinner.finish_and_clear();
    check_error(ctx).await?;

    let proceeds = ctx.lender().liquidation_proceeds().await;
    if json {
        return print_json(&proceeds);
    }

    println!(
        "{}",
        style(format!("═══ LIQUIDATION PROCEEDS ({}) ═══", proceeds.len())).blue().bold()
    );
    if ctx.lender().liquidation_source() == LiquidationSource::Stub {
        println!("  {}", style("⚠ STUB sample data, not from the API").yellow());
    }

    let now = chrono::Utc::now();
    for record in &proceeds {
        let pnl = format_number(record.pnl_value(), &NumberFormat::fixed(2));
        let pnl = if record.is_profit() { style(pnl).green() } else { style(pnl).red() };
        let status = match record.processing_status {
            ProcessingStatus::Cooldown => match record.cooldown_remaining_secs(now) {
                Some(secs) => format!("cooldown ({} left)", format_duration(secs)),
                None => "cooldown".to_string(),
            },
            other => other.to_string(),
        };
        println!(
            "  #{:<4} {:<12} {} {} sold for {}  pnl {}  {}  ({})",
            record.id,
            format_address(&record.position_address, 4, 4),
            amount(Some(record.collateral_amount.as_str())),
            record.collateral_token.symbol,
            amount(Some(record.sold_for.as_str())),
            pnl,
            status,
            format_time_ago(&record.liquidated_at),
        );
        debug!("Liquidated at {}", format_date(&record.liquidated_at, true));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    CreateOffer,
    UpdateOffer,
    ChangeLtv,
    Deposit,
    Withdraw,
}

async fn run_mutation(ctx: &AppContext, mutation: Mutation, path: &Path, json: bool) -> Result<()> {
    let payload = read_payload(path)?;

    if ctx.onboarding().should_show_risk_disclosure() {
        warn!("Risk disclosure not acknowledged - run `lavarage-lender onboarding ack-risk`");
    }

    let spinner = create_spinner("Submitting...", !json);
    let lender = ctx.lender();
    let result = match mutation {
        Mutation::CreateOffer => lender.create_offer(&payload).await,
        Mutation::UpdateOffer => lender.update_offer(&payload).await,
        Mutation::ChangeLtv => lender.change_ltv(&payload).await,
        Mutation::Deposit => lender.create_deposit_transaction(&payload).await,
        Mutation::Withdraw => lender.create_withdrawal_transaction(&payload).await,
    };
    spinner.finish_and_clear();

    let reply = result?;
    if !json {
        println!("{} {:?} accepted", style("✓").green(), mutation);
    }
    print_json(&reply)
}

async fn run_watch(ctx: &AppContext, interval: Option<u64>, json: bool) -> Result<()> {
    require_wallet(ctx).await?;
    let secs = interval.unwrap_or(ctx.config().refresh_interval_secs).max(1);
    info!("Refreshing every {}s (Ctrl+C to stop)", secs);

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = ctx.refresh().await;
                if json {
                    print_json(&summary)?;
                } else {
                    println!();
                    println!("{}", style(chrono::Local::now().format("%H:%M:%S").to_string()).dim());
                    print_summary(&summary);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}

async fn run_onboarding(ctx: &AppContext, action: OnboardingAction, json: bool) -> Result<()> {
    let onboarding = ctx.onboarding();
    onboarding.check_status().await;

    match action {
        OnboardingAction::Status => {}
        OnboardingAction::Complete => onboarding.complete().await?,
        OnboardingAction::Skip => onboarding.skip().await?,
        OnboardingAction::AckRisk => onboarding.acknowledge_risk().await?,
        OnboardingAction::Reset => onboarding.reset().await?,
    }

    let state = onboarding.state().await;
    let risk = onboarding.risk_check_at(chrono::Utc::now());

    if json {
        return print_json(&serde_json::json!({
            "state": state,
            "riskCheck": format!("{:?}", risk),
            "showRiskDisclosure": risk.requires_disclosure(),
        }));
    }

    let flag = |on: bool| if on { style("✓").green() } else { style("✗").red() };
    println!("{}", style("═══ ONBOARDING ═══").blue().bold());
    println!("  Completed:         {}", flag(state.onboarding_completed));
    println!("  Risk Acknowledged: {} ({:?})", flag(!risk.requires_disclosure()), risk);
    Ok(())
}

// ============================================
// ENTRY POINT
// ============================================

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lavarage_lender=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    if !cli.json {
        print_banner();
    }

    // Load configuration
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        None => Config::from_env()?,
    };
    if let Some(wallet) = cli.wallet.clone() {
        config.wallet_address = Some(wallet);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    let ctx = AppContext::from_config(config)?;

    match cli.command {
        Command::Summary => run_summary(&ctx, cli.json).await,
        Command::Offers => run_offers(&ctx, cli.json).await,
        Command::Positions { status } => run_positions(&ctx, status, cli.json).await,
        Command::Balance { quote_token } => run_balance(&ctx, quote_token, cli.json).await,
        Command::Liquidations => run_liquidations(&ctx, cli.json).await,
        Command::CreateOffer { payload } => {
            run_mutation(&ctx, Mutation::CreateOffer, &payload, cli.json).await
        }
        Command::UpdateOffer { payload } => {
            run_mutation(&ctx, Mutation::UpdateOffer, &payload, cli.json).await
        }
        Command::ChangeLtv { payload } => {
            run_mutation(&ctx, Mutation::ChangeLtv, &payload, cli.json).await
        }
        Command::Deposit { payload } => run_mutation(&ctx, Mutation::Deposit, &payload, cli.json).await,
        Command::Withdraw { payload } => {
            run_mutation(&ctx, Mutation::Withdraw, &payload, cli.json).await
        }
        Command::Watch { interval } => run_watch(&ctx, interval, cli.json).await,
        Command::Onboarding { action } => run_onboarding(&ctx, action, cli.json).await,
    }
}
