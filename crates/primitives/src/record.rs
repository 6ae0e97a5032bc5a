//! Records of bridge operations and their claims.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    operation::{BridgeOperation, BridgePayload},
    state::{BridgeState, Transition},
    types::{Amount, NetworkId, TxRef},
};

/// A cross-chain operation tracked from submission to finality.
///
/// The record is keyed by [`BridgeTransaction::tx_ref`], the source-chain transaction hash, which
/// never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    /// Source-chain transaction hash of the submission.
    pub tx_ref: TxRef,

    /// The network on which the operation was submitted.
    pub source_network: NetworkId,

    /// The network on which the operation is claimed.
    pub destination_network: NetworkId,

    /// The bridged token.
    pub token: Address,

    /// The bridged amount.
    pub amount: Amount,

    /// The recipient on the destination network.
    pub recipient: Address,

    /// Asset-only or bridge-and-call payload.
    pub payload: BridgePayload,

    /// Deposit count assigned by the source bridge contract, once known.
    ///
    /// Needed to build the proof for message claims.
    pub bridge_index: Option<u32>,

    /// The latest lifecycle state observed.
    state: BridgeState,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the state was last observed, either by a poll or by a claim.
    pub last_observed_at: DateTime<Utc>,

    /// Number of status polls performed for this record, successful or not.
    pub poll_attempts: u64,

    /// The last error encountered while tracking this record.
    pub last_error: Option<String>,

    /// The claim on the destination network, once submitted through the tracker.
    pub claim: Option<ClaimTransaction>,
}

impl BridgeTransaction {
    /// Creates the record for a freshly submitted operation.
    ///
    /// The initial state is always [`BridgeState::Bridged`].
    pub fn from_submission(tx_ref: TxRef, operation: &BridgeOperation) -> Self {
        let now = Utc::now();

        Self {
            tx_ref,
            source_network: operation.source_network,
            destination_network: operation.destination_network,
            token: operation.token,
            amount: operation.amount,
            recipient: operation.recipient,
            payload: operation.payload.clone(),
            bridge_index: None,
            state: BridgeState::Bridged,
            created_at: now,
            last_observed_at: now,
            poll_attempts: 0,
            last_error: None,
            claim: None,
        }
    }

    /// Creates a record for an operation that was not submitted through this system, from what
    /// an external observer reports about it.
    #[allow(clippy::too_many_arguments)]
    pub fn from_observation(
        tx_ref: TxRef,
        source_network: NetworkId,
        destination_network: NetworkId,
        token: Address,
        amount: Amount,
        recipient: Address,
        bridge_index: Option<u32>,
        state: BridgeState,
    ) -> Self {
        let now = Utc::now();

        Self {
            tx_ref,
            source_network,
            destination_network,
            token,
            amount,
            recipient,
            payload: BridgePayload::Asset,
            bridge_index,
            state,
            created_at: now,
            last_observed_at: now,
            poll_attempts: 0,
            last_error: None,
            claim: None,
        }
    }

    /// The latest lifecycle state observed.
    pub const fn state(&self) -> BridgeState {
        self.state
    }

    /// Offers an observed state to the record.
    ///
    /// The record only moves forward; a [`Transition::Regressed`] observation leaves it untouched
    /// and it is up to the caller to report it.
    pub fn observe(&mut self, observed: BridgeState) -> Transition {
        let transition = self.state.advance(observed);

        match transition {
            Transition::Applied(next) => {
                self.state = next;
                self.last_observed_at = Utc::now();
            }
            Transition::Unchanged => {
                self.last_observed_at = Utc::now();
            }
            Transition::Regressed => {}
        }

        transition
    }

    /// Attaches a confirmed claim and moves the record to [`BridgeState::Claimed`].
    pub fn record_claim(&mut self, claim: ClaimTransaction) {
        self.state = BridgeState::Claimed;
        self.last_observed_at = claim.claimed_at;
        self.last_error = None;
        self.claim = Some(claim);
    }
}

/// The destination-chain transaction that finalized a [`BridgeTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTransaction {
    /// Destination-chain transaction hash of the claim.
    pub tx_ref: TxRef,

    /// The bridge operation this claim finalizes.
    pub bridge_tx_ref: TxRef,

    /// The network on which the claim was made.
    pub destination_network: NetworkId,

    /// When the claim was confirmed.
    pub claimed_at: DateTime<Utc>,
}
