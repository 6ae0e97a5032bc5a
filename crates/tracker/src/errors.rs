//! Error types for the bridge tracker.

use std::time::Duration;

use lxly_bridge_primitives::{errors::OperationError, state::BridgeState, types::TxRef};
use lxly_status_api::StatusApiError;
use thiserror::Error;

/// This is an alias for the result type returned by the [`BridgeTracker`](crate::BridgeTracker).
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Failures reported by a [`BridgeClient`](crate::traits::BridgeClient) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeClientError {
    /// The transaction was rejected on chain. Carries the raw revert reason.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The destination chain cannot verify the operation yet.
    #[error("proof not ready: {0}")]
    ProofNotReady(String),

    /// The chain node could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider or wallet refused the request.
    #[error("provider error: {0}")]
    Provider(String),
}

/// The error type for errors produced by the [`BridgeTracker`](crate::BridgeTracker).
///
/// Every variant that concerns a specific operation carries its reference, and where known its
/// last observed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The operation descriptor is malformed. Nothing was submitted.
    #[error("invalid bridge operation: {0}")]
    InvalidOperation(#[from] OperationError),

    /// The source-chain hash is already recorded.
    #[error("bridge transaction {tx_ref} is already recorded")]
    DuplicateSubmission {
        /// The recorded operation.
        tx_ref: TxRef,
    },

    /// The source-chain call reverted or the provider refused it. Not retried.
    #[error("submission failed: {reason}")]
    SubmissionFailed {
        /// Source-chain hash, if the transaction got that far.
        tx_ref: Option<TxRef>,

        /// Why the submission failed.
        reason: String,
    },

    /// The operation is not recorded and there is not enough information to look it up.
    #[error("bridge transaction {tx_ref} is unknown: {reason}")]
    UnknownTransaction {
        /// The operation asked for.
        tx_ref: TxRef,

        /// What is missing.
        reason: String,
    },

    /// A chain node could not be reached while claiming.
    #[error("transport error for {tx_ref}: {reason}")]
    Transport {
        /// The operation being claimed.
        tx_ref: TxRef,

        /// The underlying failure.
        reason: String,
    },

    /// The destination chain cannot verify the operation yet.
    #[error("proof for {tx_ref} unavailable (state {state:?}): {reason}")]
    ProofUnavailable {
        /// The operation being claimed.
        tx_ref: TxRef,

        /// Last observed state, if recorded.
        state: Option<BridgeState>,

        /// Why the proof is not available.
        reason: String,
    },

    /// The operation has already been claimed.
    #[error("bridge transaction {tx_ref} is already claimed")]
    AlreadyClaimed {
        /// The operation being claimed.
        tx_ref: TxRef,

        /// The claim transaction, if known.
        claim_tx_ref: Option<TxRef>,
    },

    /// The claim was rejected on chain for a reason other than a prior claim.
    #[error("claim of {tx_ref} reverted: {reason}")]
    ClaimReverted {
        /// The operation being claimed.
        tx_ref: TxRef,

        /// Last observed state, if recorded.
        state: Option<BridgeState>,

        /// Raw revert reason.
        reason: String,
    },

    /// The tracking deadline passed before the operation reached a terminal state.
    #[error("tracking {tx_ref} timed out after {elapsed:?} (state {state:?})")]
    Timeout {
        /// The tracked operation.
        tx_ref: TxRef,

        /// Last observed state, if any.
        state: Option<BridgeState>,

        /// Time since tracking started.
        elapsed: Duration,
    },

    /// The status API kept failing beyond the retry ceiling.
    #[error("tracking {tx_ref} failed after {attempts} attempts (state {state:?}): {source}")]
    TrackingFailed {
        /// The tracked operation.
        tx_ref: TxRef,

        /// Last observed state, if any.
        state: Option<BridgeState>,

        /// Number of consecutive failed polls.
        attempts: usize,

        /// The last failure.
        source: StatusApiError,
    },

    /// The status API failed in a way retrying cannot fix.
    #[error("status API error while tracking {tx_ref}: {source}")]
    StatusApi {
        /// The tracked operation.
        tx_ref: TxRef,

        /// Last observed state, if any.
        state: Option<BridgeState>,

        /// The failure.
        source: StatusApiError,
    },
}

impl TrackerError {
    /// The operation the error concerns, if any.
    pub const fn tx_ref(&self) -> Option<TxRef> {
        match self {
            TrackerError::InvalidOperation(_) => None,
            TrackerError::SubmissionFailed { tx_ref, .. } => *tx_ref,
            TrackerError::DuplicateSubmission { tx_ref }
            | TrackerError::UnknownTransaction { tx_ref, .. }
            | TrackerError::Transport { tx_ref, .. }
            | TrackerError::ProofUnavailable { tx_ref, .. }
            | TrackerError::AlreadyClaimed { tx_ref, .. }
            | TrackerError::ClaimReverted { tx_ref, .. }
            | TrackerError::Timeout { tx_ref, .. }
            | TrackerError::TrackingFailed { tx_ref, .. }
            | TrackerError::StatusApi { tx_ref, .. } => Some(*tx_ref),
        }
    }

    /// Returns `true` if the error ends a tracking session.
    pub const fn ends_tracking(&self) -> bool {
        matches!(
            self,
            TrackerError::Timeout { .. }
                | TrackerError::TrackingFailed { .. }
                | TrackerError::StatusApi { .. }
        )
    }

    /// Maps a failed claim or proof request onto the tracker's taxonomy.
    pub(crate) fn from_claim_failure(
        tx_ref: TxRef,
        state: Option<BridgeState>,
        err: BridgeClientError,
    ) -> Self {
        match err {
            BridgeClientError::ProofNotReady(reason) => TrackerError::ProofUnavailable {
                tx_ref,
                state,
                reason,
            },
            BridgeClientError::Reverted(reason) if names_already_claimed(&reason) => {
                TrackerError::AlreadyClaimed {
                    tx_ref,
                    claim_tx_ref: None,
                }
            }
            BridgeClientError::Reverted(reason) => TrackerError::ClaimReverted {
                tx_ref,
                state,
                reason,
            },
            BridgeClientError::Transport(reason) | BridgeClientError::Provider(reason) => {
                TrackerError::Transport { tx_ref, reason }
            }
        }
    }
}

/// Returns `true` if a revert reason is the bridge contract's `AlreadyClaimed` error.
fn names_already_claimed(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    reason.contains("alreadyclaimed") || reason.contains("already claimed")
}
