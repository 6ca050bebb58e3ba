//! Error taxonomy for the daily calculation.

use thiserror::Error;

/// Failure modes of [`calculate`](crate::calculate).
///
/// Transient gateway failures are retried inside the gateway; anything that
/// reaches a caller is final. A caller always receives either a complete
/// [`DayResult`](crate::DayResult) or one of these, never a partial result.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested day index or the network timing constants cannot
    /// produce a valid epoch/slot range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A validator snapshot could not be decoded or indexed.
    #[error("malformed validator snapshot: {0}")]
    MalformedSnapshot(String),

    /// The beacon node kept failing after all retries were exhausted.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
