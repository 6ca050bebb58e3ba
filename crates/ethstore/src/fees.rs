//! Execution-layer fee extraction.
//!
//! A block's proposer income is derived from the raw EIP-2718 transaction
//! blobs in its execution payload. Receipts are not fetched, so each
//! transaction is priced at its gas limit:
//! `gas_limit * effective_gas_price(base_fee)`.

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;

use crate::error::{Error, Result};

/// Sum of per-transaction fees for one execution payload, in wei.
pub fn payload_fee_wei(base_fee_per_gas: u64, transactions: &[String]) -> Result<u128> {
    let mut total: u128 = 0;
    for raw in transactions {
        let fee = transaction_fee_wei(base_fee_per_gas, raw)?;
        total = total
            .checked_add(fee)
            .ok_or_else(|| Error::Internal("payload fee sum overflow".into()))?;
    }
    Ok(total)
}

fn transaction_fee_wei(base_fee_per_gas: u64, raw: &str) -> Result<u128> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| Error::Internal(format!("invalid transaction hex: {e}")))?;
    let envelope = TxEnvelope::decode_2718(&mut bytes.as_slice())
        .map_err(|e| Error::Internal(format!("undecodable transaction: {e}")))?;
    let price = envelope.effective_gas_price(Some(base_fee_per_gas));
    u128::from(envelope.gas_limit())
        .checked_mul(price)
        .ok_or_else(|| Error::Internal("transaction fee overflow".into()))
}
