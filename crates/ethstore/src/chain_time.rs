//! Epoch and slot arithmetic anchored at network genesis.
//!
//! A "day" is a fixed window of `86_400 / (seconds_per_slot * slots_per_epoch)`
//! consecutive epochs, counted from genesis. On mainnet parameters that is
//! 225 epochs of 32 slots.

use chrono::{DateTime, NaiveDate};

use crate::error::{Error, Result};
use crate::types::NetworkTimeParams;

const SECONDS_PER_DAY: u64 = 86_400;

/// Converts day indices to epoch and slot ranges.
#[derive(Debug, Clone, Copy)]
pub struct ChainTime {
    params: NetworkTimeParams,
    epochs_per_day: u64,
}

impl ChainTime {
    /// Fails with `InvalidArgument` on degenerate timing constants (zero, or
    /// an epoch duration that does not divide a day).
    pub fn new(params: NetworkTimeParams) -> Result<Self> {
        let seconds_per_epoch = params
            .seconds_per_slot
            .checked_mul(params.slots_per_epoch)
            .filter(|s| *s > 0)
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "seconds_per_slot and slots_per_epoch must be non-zero".into(),
                )
            })?;
        if seconds_per_epoch > SECONDS_PER_DAY || SECONDS_PER_DAY % seconds_per_epoch != 0 {
            return Err(Error::InvalidArgument(format!(
                "epoch duration {seconds_per_epoch}s does not divide a day"
            )));
        }
        Ok(Self {
            params,
            epochs_per_day: SECONDS_PER_DAY / seconds_per_epoch,
        })
    }

    pub fn epochs_per_day(&self) -> u64 {
        self.epochs_per_day
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.params.slots_per_epoch
    }

    /// First and last epoch of a day, both inclusive.
    pub fn day_to_epoch_range(&self, day: u64) -> Result<(u64, u64)> {
        let start = day
            .checked_mul(self.epochs_per_day)
            .ok_or_else(|| day_out_of_range(day))?;
        let end = start
            .checked_add(self.epochs_per_day - 1)
            .ok_or_else(|| day_out_of_range(day))?;
        // The closing boundary state sits one epoch further; reject days
        // whose slot numbers would not be representable.
        end.checked_add(1)
            .ok_or_else(|| day_out_of_range(day))
            .and_then(|next| self.epoch_start_slot(next))
            .map_err(|_| day_out_of_range(day))?;
        Ok((start, end))
    }

    /// First and last slot of an epoch, both inclusive.
    pub fn epoch_to_slot_range(&self, epoch: u64) -> Result<(u64, u64)> {
        let start = self.epoch_start_slot(epoch)?;
        let end = start
            .checked_add(self.params.slots_per_epoch - 1)
            .ok_or_else(|| Error::InvalidArgument(format!("epoch {epoch} out of range")))?;
        Ok((start, end))
    }

    /// Every proposal slot of a day, inclusive bounds.
    pub fn day_to_slot_range(&self, day: u64) -> Result<(u64, u64)> {
        let (start_epoch, end_epoch) = self.day_to_epoch_range(day)?;
        let (first, _) = self.epoch_to_slot_range(start_epoch)?;
        let (_, last) = self.epoch_to_slot_range(end_epoch)?;
        Ok((first, last))
    }

    /// State slot of the boundary opening the day.
    pub fn day_start_state_slot(&self, day: u64) -> Result<u64> {
        let (start_epoch, _) = self.day_to_epoch_range(day)?;
        self.epoch_start_slot(start_epoch)
    }

    /// State slot of the boundary closing the day: the first slot of the
    /// next day.
    pub fn day_end_state_slot(&self, day: u64) -> Result<u64> {
        let (_, end_epoch) = self.day_to_epoch_range(day)?;
        end_epoch
            .checked_add(1)
            .ok_or_else(|| day_out_of_range(day))
            .and_then(|next| self.epoch_start_slot(next))
    }

    /// UTC calendar date of the day's first slot.
    pub fn day_to_date(&self, day: u64) -> Result<NaiveDate> {
        let since_genesis = day
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|s| s.checked_add(self.params.genesis_time))
            .ok_or_else(|| day_out_of_range(day))?;
        let timestamp = i64::try_from(since_genesis).map_err(|_| day_out_of_range(day))?;
        DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| day_out_of_range(day))
    }

    fn epoch_start_slot(&self, epoch: u64) -> Result<u64> {
        epoch
            .checked_mul(self.params.slots_per_epoch)
            .ok_or_else(|| Error::InvalidArgument(format!("epoch {epoch} out of range")))
    }
}

fn day_out_of_range(day: u64) -> Error {
    Error::InvalidArgument(format!("day {day} out of range"))
}
