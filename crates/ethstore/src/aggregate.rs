//! Day-level aggregation: the slot walk and result assembly.
//!
//! Slot fetches fan out through a bounded pool; every sum is accumulated on
//! the orchestrating task, so workers only fetch and decode.

use std::collections::BTreeSet;

use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::apr;
use crate::beacon::ChainDataGateway;
use crate::chain_time::ChainTime;
use crate::eligibility;
use crate::error::{Error, Result};
use crate::snapshot::SnapshotIndex;
use crate::types::DayResult;

const WEI_PER_GWEI: i128 = 1_000_000_000;

/// Compute one day's result through an injected gateway.
///
/// Either returns a complete, internally consistent [`DayResult`] or an
/// error; partial results are never produced.
pub async fn calculate_with_gateway<G: ChainDataGateway + ?Sized>(
    gateway: &G,
    day: u64,
    concurrency: usize,
) -> Result<DayResult> {
    let params = gateway.time_params().await?;
    let chain = ChainTime::new(params)?;
    let (start_epoch, end_epoch) = chain.day_to_epoch_range(day)?;
    let date = chain.day_to_date(day)?;
    info!(day, start_epoch, end_epoch, %date, "aggregating day");

    let start_index = SnapshotIndex::build(
        gateway
            .validators_at(chain.day_start_state_slot(day)?)
            .await?,
    )?;
    let end_index =
        SnapshotIndex::build(gateway.validators_at(chain.day_end_state_slot(day)?).await?)?;

    let eligible = eligibility::eligible_indices(&start_index, &end_index, start_epoch, end_epoch);
    debug!(
        start = start_index.len(),
        end = end_index.len(),
        eligible = eligible.len(),
        "selected eligible validator set"
    );

    let balances = sum_balances(&start_index, &end_index, &eligible)?;

    let (first_slot, last_slot) = chain.day_to_slot_range(day)?;
    let walk = walk_slots(
        gateway,
        first_slot,
        last_slot,
        &eligible,
        &start_index,
        concurrency,
    )
    .await?;

    let start_gwei = to_i128(balances.start_gwei, "start balance")?;
    let end_gwei = to_i128(balances.end_gwei, "end balance")?;
    let deposits_gwei = to_i128(walk.deposits_gwei, "deposits sum")?;
    let fees_wei = to_i128(walk.fees_wei, "tx fee sum")?;

    let consensus_rewards_gwei = end_gwei - start_gwei - deposits_gwei;
    let total_rewards_wei = consensus_rewards_gwei
        .checked_mul(WEI_PER_GWEI)
        .and_then(|wei| wei.checked_add(fees_wei))
        .ok_or_else(|| Error::Internal("total rewards overflow".into()))?;
    let effective_wei = to_i128(balances.effective_gwei, "effective balance")?
        .checked_mul(WEI_PER_GWEI)
        .ok_or_else(|| Error::Internal("effective balance overflow".into()))?;

    let apr = apr::annualized_rate(
        to_decimal(total_rewards_wei, "total rewards")?,
        to_decimal(effective_wei, "effective balance")?,
    );

    Ok(DayResult {
        day,
        start_epoch,
        end_epoch,
        validator_count: eligible.len() as u64,
        start_balance_gwei: to_decimal(start_gwei, "start balance")?,
        end_balance_gwei: to_decimal(end_gwei, "end balance")?,
        deposits_sum_gwei: to_decimal(deposits_gwei, "deposits sum")?,
        consensus_rewards_gwei: to_decimal(consensus_rewards_gwei, "consensus rewards")?,
        tx_fees_sum_wei: to_decimal(fees_wei, "tx fee sum")?,
        total_rewards_wei: to_decimal(total_rewards_wei, "total rewards")?,
        apr,
    })
}

#[derive(Debug, Default)]
struct BalanceSums {
    start_gwei: u128,
    end_gwei: u128,
    effective_gwei: u128,
}

/// Balance sums over the eligible set; the effective balance is taken at the
/// opening boundary.
fn sum_balances(
    start: &SnapshotIndex,
    end: &SnapshotIndex,
    eligible: &BTreeSet<u64>,
) -> Result<BalanceSums> {
    let mut sums = BalanceSums::default();
    for &index in eligible {
        let opening = start.get(index).ok_or_else(|| {
            Error::Internal(format!("eligible validator {index} missing from start snapshot"))
        })?;
        let closing = end.get(index).ok_or_else(|| {
            Error::Internal(format!("eligible validator {index} missing from end snapshot"))
        })?;
        sums.start_gwei += u128::from(opening.balance_gwei);
        sums.end_gwei += u128::from(closing.balance_gwei);
        sums.effective_gwei += u128::from(opening.effective_balance_gwei);
    }
    Ok(sums)
}

#[derive(Debug, Default)]
struct WalkSums {
    deposits_gwei: u128,
    fees_wei: u128,
    proposed: u64,
    missed: u64,
}

/// Walk every slot of the day, folding fees (proposer-keyed) and deposits
/// (depositor-keyed) against the eligible set.
async fn walk_slots<G: ChainDataGateway + ?Sized>(
    gateway: &G,
    first_slot: u64,
    last_slot: u64,
    eligible: &BTreeSet<u64>,
    start_index: &SnapshotIndex,
    concurrency: usize,
) -> Result<WalkSums> {
    let slots: Vec<u64> = (first_slot..=last_slot).collect();
    let mut sums = WalkSums::default();
    for chunk in slots.chunks(concurrency.max(1)) {
        let fetches: Vec<_> = chunk.iter().map(|&slot| gateway.block_at(slot)).collect();
        for block in try_join_all(fetches).await? {
            let Some(block) = block else {
                sums.missed += 1;
                continue;
            };
            sums.proposed += 1;
            if eligible.contains(&block.proposer_index) {
                sums.fees_wei += block.fee_wei;
            }
            for deposit in &block.deposits {
                let Some(depositor) = start_index.index_of_pubkey(&deposit.pubkey) else {
                    continue;
                };
                if eligible.contains(&depositor) {
                    sums.deposits_gwei += u128::from(deposit.amount_gwei);
                }
            }
        }
    }
    debug!(
        proposed = sums.proposed,
        missed = sums.missed,
        "slot walk complete"
    );
    Ok(sums)
}

fn to_i128(value: u128, what: &str) -> Result<i128> {
    i128::try_from(value).map_err(|_| Error::Internal(format!("{what} exceeds i128 range")))
}

fn to_decimal(value: i128, what: &str) -> Result<Decimal> {
    Decimal::try_from_i128_with_scale(value, 0)
        .map_err(|_| Error::Internal(format!("{what} exceeds decimal range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::types::{
        BlockRecord, Deposit, FAR_FUTURE_EPOCH, NetworkTimeParams, ValidatorSnapshot,
        ValidatorStatus,
    };

    // A compact network: 4-slot epochs of 2700s, so a day is 8 epochs and
    // 32 slots. Day 1 spans epochs 8..=15, slots 32..=63, with boundary
    // states at slots 32 and 64.
    const DAY: u64 = 1;
    const START_STATE_SLOT: u64 = 32;
    const END_STATE_SLOT: u64 = 64;

    fn params() -> NetworkTimeParams {
        NetworkTimeParams {
            genesis_time: 1_606_824_023,
            seconds_per_slot: 2_700,
            slots_per_epoch: 4,
        }
    }

    struct MockGateway {
        snapshots: HashMap<u64, Vec<ValidatorSnapshot>>,
        blocks: HashMap<u64, BlockRecord>,
        failing_slot: Option<u64>,
    }

    #[async_trait]
    impl ChainDataGateway for MockGateway {
        async fn time_params(&self) -> Result<NetworkTimeParams> {
            Ok(params())
        }

        async fn validators_at(&self, state_slot: u64) -> Result<Vec<ValidatorSnapshot>> {
            self.snapshots
                .get(&state_slot)
                .cloned()
                .ok_or_else(|| Error::GatewayUnavailable(format!("no snapshot at {state_slot}")))
        }

        async fn block_at(&self, slot: u64) -> Result<Option<BlockRecord>> {
            if self.failing_slot == Some(slot) {
                return Err(Error::GatewayUnavailable(format!("slot {slot} unavailable")));
            }
            Ok(self.blocks.get(&slot).cloned())
        }
    }

    fn validator(index: u64, balance_gwei: u64) -> ValidatorSnapshot {
        ValidatorSnapshot {
            index,
            pubkey: format!("{index:#096x}"),
            balance_gwei,
            effective_balance_gwei: 32_000_000_000,
            status: ValidatorStatus::ActiveOngoing,
            slashed: false,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
        }
    }

    fn block(slot: u64, proposer_index: u64, fee_wei: u128, deposits: Vec<Deposit>) -> BlockRecord {
        BlockRecord {
            slot,
            proposer_index,
            deposits,
            fee_wei,
        }
    }

    fn deposit(pubkey: &str, amount_gwei: u64) -> Deposit {
        Deposit {
            pubkey: pubkey.to_string(),
            amount_gwei,
        }
    }

    /// Validator 0 is eligible; validator 1 gets slashed during the day;
    /// validator 2 activates mid-day. Fees from validator 2's block and
    /// deposits to anyone but validator 0 must not count.
    fn churn_world() -> MockGateway {
        let mut start = vec![
            validator(0, 32_000_000_000),
            validator(1, 32_000_000_000),
            validator(2, 32_000_000_000),
        ];
        start[2].activation_epoch = 9;
        start[2].status = ValidatorStatus::PendingQueued;

        let mut end = vec![
            validator(0, 32_000_000_105),
            validator(1, 31_000_000_000),
            validator(2, 32_000_000_007),
        ];
        end[1].slashed = true;
        end[1].status = ValidatorStatus::ActiveSlashed;
        end[2].activation_epoch = 9;

        let v0_key = format!("{:#096x}", 0u64);
        let v2_key = format!("{:#096x}", 2u64);
        let blocks = HashMap::from([
            (33, block(33, 0, 1_000, vec![])),
            (
                34,
                block(
                    34,
                    2,
                    500,
                    vec![
                        deposit(&v0_key, 5),
                        deposit(&v2_key, 7),
                        deposit("0xffff", 9),
                    ],
                ),
            ),
        ]);

        MockGateway {
            snapshots: HashMap::from([(START_STATE_SLOT, start), (END_STATE_SLOT, end)]),
            blocks,
            failing_slot: None,
        }
    }

    #[tokio::test]
    async fn test_churn_aware_day_aggregation() {
        let gateway = churn_world();
        let result = calculate_with_gateway(&gateway, DAY, 8).await.unwrap();

        assert_eq!(result.day, DAY);
        assert_eq!(result.start_epoch, 8);
        assert_eq!(result.end_epoch, 15);
        assert_eq!(result.validator_count, 1);
        assert_eq!(result.start_balance_gwei, Decimal::from(32_000_000_000u64));
        assert_eq!(result.end_balance_gwei, Decimal::from(32_000_000_105u64));
        assert_eq!(result.deposits_sum_gwei, Decimal::from(5u64));
        assert_eq!(result.consensus_rewards_gwei, Decimal::from(100u64));
        assert_eq!(result.tx_fees_sum_wei, Decimal::from(1_000u64));
        assert_eq!(
            result.total_rewards_wei,
            Decimal::from(100_000_001_000u64)
        );

        let expected_apr = Decimal::from(365u32) * Decimal::from(100_000_001_000u64)
            / "32000000000000000000".parse::<Decimal>().unwrap();
        assert_eq!(result.apr, expected_apr);
    }

    #[tokio::test]
    async fn test_balances_round_trip_exactly() {
        let gateway = churn_world();
        let result = calculate_with_gateway(&gateway, DAY, 8).await.unwrap();
        assert_eq!(
            result.start_balance_gwei + result.consensus_rewards_gwei + result.deposits_sum_gwei,
            result.end_balance_gwei
        );
    }

    #[tokio::test]
    async fn test_identical_state_yields_identical_results() {
        let gateway = churn_world();
        let first = calculate_with_gateway(&gateway, DAY, 8).await.unwrap();
        let second = calculate_with_gateway(&gateway, DAY, 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_eligible_set_is_not_an_error() {
        let mut slashed = validator(0, 32_000_000_000);
        slashed.slashed = true;
        let gateway = MockGateway {
            snapshots: HashMap::from([
                (START_STATE_SLOT, vec![slashed.clone()]),
                (END_STATE_SLOT, vec![slashed]),
            ]),
            blocks: HashMap::from([(40, block(40, 0, 9_999, vec![]))]),
            failing_slot: None,
        };
        let result = calculate_with_gateway(&gateway, DAY, 8).await.unwrap();
        assert_eq!(result.validator_count, 0);
        assert_eq!(result.apr, Decimal::ZERO);
        assert_eq!(result.tx_fees_sum_wei, Decimal::ZERO);
        assert_eq!(result.start_balance_gwei, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unavailable_slot_aborts_the_call() {
        let mut gateway = churn_world();
        gateway.failing_slot = Some(50);
        let err = calculate_with_gateway(&gateway, DAY, 8).await.unwrap_err();
        assert!(matches!(err, Error::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_day_out_of_range_is_invalid_argument() {
        let gateway = churn_world();
        let err = calculate_with_gateway(&gateway, u64::MAX / 8 + 1, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
