//! Beacon-node HTTP gateway.
//!
//! JSON client for the standard beacon REST API. Numeric fields arrive as
//! quoted strings and are parsed explicitly: validator-list failures map to
//! `MalformedSnapshot`, block-payload failures to `Internal`. A 404 on a
//! block fetch is a missed slot, not an error.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

use crate::Config;
use crate::error::{Error, Result};
use crate::fees;
use crate::types::{BlockRecord, Deposit, NetworkTimeParams, ValidatorSnapshot, ValidatorStatus};

/// Data source for one day's computation.
///
/// The production implementation is [`BeaconNodeClient`]; tests inject
/// fixture gateways.
#[async_trait]
pub trait ChainDataGateway: Send + Sync {
    /// Genesis time and slot timing constants.
    async fn time_params(&self) -> Result<NetworkTimeParams>;

    /// The full validator list at an exact state slot.
    async fn validators_at(&self, state_slot: u64) -> Result<Vec<ValidatorSnapshot>>;

    /// The block proposed at a slot, or `None` for a missed slot.
    async fn block_at(&self, slot: u64) -> Result<Option<BlockRecord>>;
}

/// HTTP gateway against a beacon node.
///
/// Every request carries the configured deadline and is retried with
/// exponential backoff before surfacing `GatewayUnavailable`.
pub struct BeaconNodeClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_backoff: std::time::Duration,
}

impl BeaconNodeClient {
    pub fn new(endpoint: &str, config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// GET a JSON document with bounded exponential-backoff retries.
    /// `Ok(None)` is a 404; callers decide what absence means.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.endpoint, path);
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_backoff * 2u32.pow(attempt - 1);
                debug!(%url, attempt, ?delay, "retrying beacon request");
                sleep(delay).await;
            }
            match self.http.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_success() {
                        match response.json::<T>().await {
                            Ok(body) => return Ok(Some(body)),
                            Err(e) => last_error = format!("invalid response body: {e}"),
                        }
                    } else {
                        last_error = format!("status {status}");
                    }
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(Error::GatewayUnavailable(format!("{url}: {last_error}")))
    }
}

#[async_trait]
impl ChainDataGateway for BeaconNodeClient {
    async fn time_params(&self) -> Result<NetworkTimeParams> {
        let genesis: GenesisResponse = self
            .get_json("/eth/v1/beacon/genesis")
            .await?
            .ok_or_else(|| Error::GatewayUnavailable("genesis info not available".into()))?;
        let spec: SpecResponse = self
            .get_json("/eth/v1/config/spec")
            .await?
            .ok_or_else(|| Error::GatewayUnavailable("spec constants not available".into()))?;
        Ok(NetworkTimeParams {
            genesis_time: node_u64("genesis_time", &genesis.data.genesis_time)?,
            seconds_per_slot: node_u64("SECONDS_PER_SLOT", &spec.data.seconds_per_slot)?,
            slots_per_epoch: node_u64("SLOTS_PER_EPOCH", &spec.data.slots_per_epoch)?,
        })
    }

    async fn validators_at(&self, state_slot: u64) -> Result<Vec<ValidatorSnapshot>> {
        let path = format!("/eth/v1/beacon/states/{state_slot}/validators");
        let response: ValidatorsResponse = self.get_json(&path).await?.ok_or_else(|| {
            Error::GatewayUnavailable(format!("no validator snapshot at slot {state_slot}"))
        })?;
        debug!(state_slot, count = response.data.len(), "fetched validator snapshot");
        response.data.into_iter().map(decode_validator).collect()
    }

    async fn block_at(&self, slot: u64) -> Result<Option<BlockRecord>> {
        let path = format!("/eth/v2/beacon/blocks/{slot}");
        let Some(response) = self.get_json::<BlockResponse>(&path).await? else {
            return Ok(None);
        };
        decode_block(response).map(Some)
    }
}

// =============================================================================
// Response DTOs: quoted numerics, exactly as the API serves them
// =============================================================================

#[derive(Debug, Deserialize)]
struct GenesisResponse {
    data: GenesisData,
}

#[derive(Debug, Deserialize)]
struct GenesisData {
    genesis_time: String,
}

#[derive(Debug, Deserialize)]
struct SpecResponse {
    data: SpecData,
}

#[derive(Debug, Deserialize)]
struct SpecData {
    #[serde(rename = "SECONDS_PER_SLOT")]
    seconds_per_slot: String,
    #[serde(rename = "SLOTS_PER_EPOCH")]
    slots_per_epoch: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorsResponse {
    data: Vec<ValidatorData>,
}

#[derive(Debug, Deserialize)]
struct ValidatorData {
    index: String,
    balance: String,
    status: ValidatorStatus,
    validator: ValidatorDetails,
}

#[derive(Debug, Deserialize)]
struct ValidatorDetails {
    pubkey: String,
    effective_balance: String,
    slashed: bool,
    activation_epoch: String,
    exit_epoch: String,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    data: BlockData,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    message: BlockMessage,
}

#[derive(Debug, Deserialize)]
struct BlockMessage {
    slot: String,
    proposer_index: String,
    body: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    #[serde(default)]
    deposits: Vec<DepositData>,
    /// Absent on pre-merge blocks, which carry no execution-layer fees.
    #[serde(default)]
    execution_payload: Option<ExecutionPayload>,
}

#[derive(Debug, Deserialize)]
struct DepositData {
    data: DepositDetails,
}

#[derive(Debug, Deserialize)]
struct DepositDetails {
    pubkey: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionPayload {
    base_fee_per_gas: String,
    #[serde(default)]
    transactions: Vec<String>,
}

// =============================================================================
// Decoding
// =============================================================================

fn decode_validator(data: ValidatorData) -> Result<ValidatorSnapshot> {
    Ok(ValidatorSnapshot {
        index: snapshot_u64("index", &data.index)?,
        pubkey: data.validator.pubkey,
        balance_gwei: snapshot_u64("balance", &data.balance)?,
        effective_balance_gwei: snapshot_u64(
            "effective_balance",
            &data.validator.effective_balance,
        )?,
        status: data.status,
        slashed: data.validator.slashed,
        activation_epoch: snapshot_u64("activation_epoch", &data.validator.activation_epoch)?,
        exit_epoch: snapshot_u64("exit_epoch", &data.validator.exit_epoch)?,
    })
}

fn decode_block(response: BlockResponse) -> Result<BlockRecord> {
    let message = response.data.message;
    let deposits = message
        .body
        .deposits
        .into_iter()
        .map(|deposit| {
            Ok(Deposit {
                amount_gwei: node_u64("deposit amount", &deposit.data.amount)?,
                pubkey: deposit.data.pubkey,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let fee_wei = match &message.body.execution_payload {
        Some(payload) => {
            let base_fee = node_u64("base_fee_per_gas", &payload.base_fee_per_gas)?;
            fees::payload_fee_wei(base_fee, &payload.transactions)?
        }
        None => 0,
    };
    Ok(BlockRecord {
        slot: node_u64("slot", &message.slot)?,
        proposer_index: node_u64("proposer_index", &message.proposer_index)?,
        deposits,
        fee_wei,
    })
}

fn snapshot_u64(field: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        Error::MalformedSnapshot(format!("unparsable {field}: {value:?}"))
    })
}

fn node_u64(field: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Internal(format!("unparsable {field}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_validator_parses_quoted_numerics() {
        let data: ValidatorData = serde_json::from_value(serde_json::json!({
            "index": "42",
            "balance": "32000000000",
            "status": "active_ongoing",
            "validator": {
                "pubkey": "0xab",
                "effective_balance": "32000000000",
                "slashed": false,
                "activation_epoch": "0",
                "exit_epoch": "18446744073709551615"
            }
        }))
        .unwrap();
        let validator = decode_validator(data).unwrap();
        assert_eq!(validator.index, 42);
        assert_eq!(validator.exit_epoch, u64::MAX);
        assert_eq!(validator.status, ValidatorStatus::ActiveOngoing);
        assert!(!validator.is_slashed());
    }

    #[test]
    fn test_unparsable_validator_field_is_malformed_snapshot() {
        let data: ValidatorData = serde_json::from_value(serde_json::json!({
            "index": "not-a-number",
            "balance": "0",
            "status": "active_ongoing",
            "validator": {
                "pubkey": "0xab",
                "effective_balance": "0",
                "slashed": false,
                "activation_epoch": "0",
                "exit_epoch": "0"
            }
        }))
        .unwrap();
        assert!(matches!(
            decode_validator(data),
            Err(Error::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_decode_block_without_execution_payload() {
        let response: BlockResponse = serde_json::from_value(serde_json::json!({
            "data": { "message": {
                "slot": "7",
                "proposer_index": "3",
                "body": {
                    "deposits": [
                        { "data": { "pubkey": "0xcd", "amount": "32000000000" } }
                    ]
                }
            }}
        }))
        .unwrap();
        let block = decode_block(response).unwrap();
        assert_eq!(block.slot, 7);
        assert_eq!(block.proposer_index, 3);
        assert_eq!(block.fee_wei, 0);
        assert_eq!(block.deposits.len(), 1);
        assert_eq!(block.deposits[0].amount_gwei, 32_000_000_000);
    }
}
