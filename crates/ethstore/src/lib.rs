//! Daily eth.store APR for a proof-of-stake validator set.
//!
//! One call computes one day: the validator set eligible for the whole day
//! is derived from the boundary snapshots, every slot of the day is walked
//! to fold proposer fee income and to exclude new deposits from the reward,
//! and the result is annualized against the set's effective balance. All
//! money math is exact decimal arithmetic; a call returns either a complete
//! [`DayResult`] or an error, never a partial result.
//!
//! ```no_run
//! # async fn run() -> ethstore::Result<()> {
//! let config = ethstore::Config::default();
//! let day = ethstore::calculate("http://localhost:5052", 10, &config).await?;
//! println!("day {} apr {}", day.day, day.apr);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod apr;
pub mod beacon;
pub mod chain_time;
pub mod eligibility;
pub mod error;
pub mod fees;
pub mod snapshot;
pub mod types;

pub use aggregate::calculate_with_gateway;
pub use beacon::{BeaconNodeClient, ChainDataGateway};
pub use chain_time::ChainTime;
pub use error::{Error, Result};
pub use snapshot::SnapshotIndex;
pub use types::{
    BlockRecord, DayResult, Deposit, FAR_FUTURE_EPOCH, NetworkTimeParams, ValidatorSnapshot,
    ValidatorStatus,
};

use std::time::Duration;

/// Tuning for one calculation run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline applied to every beacon-node request.
    pub request_timeout: Duration,
    /// Retries per request after the first attempt.
    pub max_retries: u32,
    /// Base delay for exponential retry backoff.
    pub retry_backoff: Duration,
    /// Width of the slot-fetch worker pool.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            concurrency: 32,
        }
    }
}

/// Compute the day result for `day` against a beacon node endpoint.
pub async fn calculate(endpoint: &str, day: u64, config: &Config) -> Result<DayResult> {
    let gateway = BeaconNodeClient::new(endpoint, config)?;
    calculate_with_gateway(&gateway, day, config.concurrency).await
}
