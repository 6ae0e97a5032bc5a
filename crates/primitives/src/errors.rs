//! Errors produced while constructing or validating primitive types.

use thiserror::Error;

use crate::types::NetworkId;

/// Error returned when an amount cannot be parsed from its decimal representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    /// The input was empty.
    #[error("amount must not be empty")]
    Empty,

    /// The input contained something other than decimal digits.
    ///
    /// Signs are rejected here too, which is what makes negative amounts unrepresentable.
    #[error("amount must only contain decimal digits, found {0:?}")]
    InvalidDigit(char),

    /// The value does not fit in 256 bits.
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// Error returned when a transaction reference cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transaction hash {input:?}: expected 32 bytes of hex")]
pub struct TxRefParseError {
    /// The rejected input.
    pub input: String,
}

/// Error returned when a bridge operation descriptor is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Source and destination networks are the same.
    #[error("source and destination network must differ, both are {0}")]
    SameNetwork(NetworkId),
}

/// Error returned when a status string does not name a known lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bridge status: {0:?}")]
pub struct UnknownStateError(pub String);
