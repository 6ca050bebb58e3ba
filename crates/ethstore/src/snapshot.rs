//! Index over one validator-list snapshot.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::ValidatorSnapshot;

/// O(1) lookup by validator index and by public key over one snapshot.
///
/// Built once per boundary snapshot so the per-slot deposit resolution stays
/// linear in the number of slots.
#[derive(Debug)]
pub struct SnapshotIndex {
    by_index: HashMap<u64, ValidatorSnapshot>,
    index_by_pubkey: HashMap<String, u64>,
}

impl SnapshotIndex {
    /// Fails with `MalformedSnapshot` on duplicate indices or pubkeys.
    pub fn build(validators: Vec<ValidatorSnapshot>) -> Result<Self> {
        let mut by_index = HashMap::with_capacity(validators.len());
        let mut index_by_pubkey = HashMap::with_capacity(validators.len());
        for validator in validators {
            if index_by_pubkey
                .insert(normalize_pubkey(&validator.pubkey), validator.index)
                .is_some()
            {
                return Err(Error::MalformedSnapshot(format!(
                    "duplicate pubkey {}",
                    validator.pubkey
                )));
            }
            let index = validator.index;
            if by_index.insert(index, validator).is_some() {
                return Err(Error::MalformedSnapshot(format!(
                    "duplicate validator index {index}"
                )));
            }
        }
        Ok(Self {
            by_index,
            index_by_pubkey,
        })
    }

    pub fn get(&self, index: u64) -> Option<&ValidatorSnapshot> {
        self.by_index.get(&index)
    }

    pub fn index_of_pubkey(&self, pubkey: &str) -> Option<u64> {
        self.index_by_pubkey.get(&normalize_pubkey(pubkey)).copied()
    }

    pub fn indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_index.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// Pubkeys compare case-insensitively; deposits and validator records may
/// differ in hex casing.
fn normalize_pubkey(pubkey: &str) -> String {
    pubkey.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidatorStatus;

    fn validator(index: u64, pubkey: &str) -> ValidatorSnapshot {
        ValidatorSnapshot {
            index,
            pubkey: pubkey.to_string(),
            balance_gwei: 32_000_000_000,
            effective_balance_gwei: 32_000_000_000,
            status: ValidatorStatus::ActiveOngoing,
            slashed: false,
            activation_epoch: 0,
            exit_epoch: u64::MAX,
        }
    }

    #[test]
    fn test_lookup_by_index_and_pubkey() {
        let index =
            SnapshotIndex::build(vec![validator(0, "0xaa"), validator(7, "0xbb")]).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(7).unwrap().pubkey, "0xbb");
        assert_eq!(index.index_of_pubkey("0xaa"), Some(0));
        assert_eq!(index.index_of_pubkey("0xAA"), Some(0));
        assert_eq!(index.index_of_pubkey("0xcc"), None);
        assert!(index.get(1).is_none());
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = SnapshotIndex::build(vec![validator(3, "0xaa"), validator(3, "0xbb")])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSnapshot(_)));
    }

    #[test]
    fn test_duplicate_pubkey_rejected() {
        let err = SnapshotIndex::build(vec![validator(1, "0xaa"), validator(2, "0xAA")])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSnapshot(_)));
    }

    #[test]
    fn test_empty_snapshot_is_legal() {
        let index = SnapshotIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
    }
}
