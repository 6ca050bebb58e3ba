//! Data model shared across the calculation.
//!
//! All monetary amounts are integers in the chain's base accounting units:
//! consensus-layer balances and deposits in Gwei, execution-layer fees in
//! wei. [`DayResult`] exposes them as [`Decimal`] so downstream consumers
//! never see floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exit/activation epoch sentinel meaning "never".
pub const FAR_FUTURE_EPOCH: u64 = u64::MAX;

/// Genesis time and slot timing constants, fetched once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkTimeParams {
    /// Unix timestamp of the first slot.
    pub genesis_time: u64,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
}

/// Validator lifecycle as reported by the beacon API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
}

impl ValidatorStatus {
    pub fn is_slashed(&self) -> bool {
        matches!(
            self,
            ValidatorStatus::ActiveSlashed | ValidatorStatus::ExitedSlashed
        )
    }
}

/// One validator's state at a snapshot boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSnapshot {
    pub index: u64,
    /// 0x-prefixed hex, fixed length, unique within a snapshot.
    pub pubkey: String,
    pub balance_gwei: u64,
    /// Protocol-capped balance used as the APR denominator.
    pub effective_balance_gwei: u64,
    pub status: ValidatorStatus,
    pub slashed: bool,
    pub activation_epoch: u64,
    /// [`FAR_FUTURE_EPOCH`] for validators with no scheduled exit.
    pub exit_epoch: u64,
}

impl ValidatorSnapshot {
    /// Slashed according to the validator record or its reported status.
    pub fn is_slashed(&self) -> bool {
        self.slashed || self.status.is_slashed()
    }
}

/// A deposit carried in a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub pubkey: String,
    pub amount_gwei: u64,
}

/// Everything the day walk needs from one proposed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub slot: u64,
    pub proposer_index: u64,
    pub deposits: Vec<Deposit>,
    /// Proposer fee income extracted from the execution payload; zero for
    /// blocks without one.
    pub fee_wei: u128,
}

/// The complete, internally consistent result for one day.
///
/// `start_balance_gwei + consensus_rewards_gwei + deposits_sum_gwei`
/// equals `end_balance_gwei` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayResult {
    pub day: u64,
    pub start_epoch: u64,
    pub end_epoch: u64,
    /// Size of the eligible validator set.
    pub validator_count: u64,
    pub start_balance_gwei: Decimal,
    pub end_balance_gwei: Decimal,
    pub deposits_sum_gwei: Decimal,
    /// May be negative (e.g. a day dominated by penalties).
    pub consensus_rewards_gwei: Decimal,
    pub tx_fees_sum_wei: Decimal,
    pub total_rewards_wei: Decimal,
    /// Annualized rate; zero when the eligible set is empty.
    pub apr: Decimal,
}
