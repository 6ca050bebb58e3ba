//! Daily eth.store APR calculator.
//!
//! Fetches one day of consensus and execution-layer data from a beacon node
//! and prints the day's annualized reward rate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use ethstore::{ChainDataGateway, Config, DayResult};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "ethstore")]
#[command(about = "Daily eth.store APR for a proof-of-stake validator set")]
struct Args {
    /// Beacon node API endpoint (e.g. http://localhost:5052)
    #[arg(short, long)]
    node: String,

    /// Day index since genesis, or "latest" for the most recent completed day
    day: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Concurrent block fetches
    #[arg(long, default_value_t = 32)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Retries per request after the first attempt
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config {
        request_timeout: Duration::from_secs(args.timeout),
        max_retries: args.retries,
        retry_backoff: Duration::from_secs(1),
        concurrency: args.concurrency,
    };

    let day = resolve_day(&args.node, &args.day, &config).await?;
    let result = ethstore::calculate(&args.node, day, &config)
        .await
        .with_context(|| format!("failed to calculate day {day}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

/// Parse a day index, resolving "latest" to the most recent day that has
/// fully completed.
async fn resolve_day(node: &str, day: &str, config: &Config) -> Result<u64> {
    if day != "latest" {
        return day
            .parse()
            .with_context(|| format!("invalid day index {day:?} (expected a number or \"latest\")"));
    }
    let gateway = ethstore::BeaconNodeClient::new(node, config)?;
    let params = gateway.time_params().await?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    anyhow::ensure!(now > params.genesis_time, "the network has not started yet");
    Ok(((now - params.genesis_time) / SECONDS_PER_DAY).saturating_sub(1))
}

fn print_summary(result: &DayResult) {
    println!("eth.store day {}", result.day);
    println!("=============================================");
    println!("{:<20} {} - {}", "Epochs:", result.start_epoch, result.end_epoch);
    println!("{:<20} {}", "Validators:", result.validator_count);
    println!("{:<20} {} Gwei", "Start balance:", result.start_balance_gwei);
    println!("{:<20} {} Gwei", "End balance:", result.end_balance_gwei);
    println!("{:<20} {} Gwei", "Deposits:", result.deposits_sum_gwei);
    println!(
        "{:<20} {} Gwei",
        "Consensus rewards:", result.consensus_rewards_gwei
    );
    println!("{:<20} {} Wei", "Tx fees:", result.tx_fees_sum_wei);
    println!("{:<20} {} Wei", "Total rewards:", result.total_rewards_wei);
    println!(
        "{:<20} {} ({}%)",
        "APR:",
        result.apr.round_dp(10),
        (result.apr * Decimal::ONE_HUNDRED).round_dp(4)
    );
}
