//! Descriptors for operations a caller asks the bridge to perform.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::{
    errors::OperationError,
    types::{Amount, NetworkId},
};

/// The payload shape carried by a bridge operation.
///
/// Plain asset transfers and bridge-and-call operations share the same submission and claim
/// capability; they only differ in what is delivered on the destination network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgePayload {
    /// Transfer of an asset to the recipient.
    Asset,

    /// Transfer of an asset followed by a contract call on the destination network.
    Message {
        /// ABI-encoded call executed on the destination network.
        call_data: Bytes,

        /// Address that receives the asset if the call fails on the destination network.
        fallback_address: Option<Address>,
    },
}

impl BridgePayload {
    /// Returns `true` if the operation carries a call payload and must be claimed as a message.
    pub const fn is_message(&self) -> bool {
        matches!(self, BridgePayload::Message { .. })
    }
}

/// Everything needed to submit a bridge or bridge-and-call operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOperation {
    /// The network on which the operation is submitted.
    pub source_network: NetworkId,

    /// The network on which the asset or message is claimed.
    pub destination_network: NetworkId,

    /// The token being bridged. The zero address denotes the native gas token.
    pub token: Address,

    /// The amount in the token's smallest denomination.
    pub amount: Amount,

    /// The recipient on the destination network.
    pub recipient: Address,

    /// Asset-only or bridge-and-call payload.
    pub payload: BridgePayload,

    /// Whether the submission also updates the global exit root on the source network.
    #[serde(default = "default_force_update")]
    pub force_update_global_exit_root: bool,
}

const fn default_force_update() -> bool {
    true
}

impl BridgeOperation {
    /// Creates a plain asset transfer.
    pub const fn asset(
        source_network: NetworkId,
        destination_network: NetworkId,
        token: Address,
        amount: Amount,
        recipient: Address,
    ) -> Self {
        Self {
            source_network,
            destination_network,
            token,
            amount,
            recipient,
            payload: BridgePayload::Asset,
            force_update_global_exit_root: true,
        }
    }

    /// Turns this operation into a bridge-and-call operation.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_call(mut self, call_data: Bytes, fallback_address: Option<Address>) -> Self {
        self.payload = BridgePayload::Message {
            call_data,
            fallback_address,
        };
        self
    }

    /// Updates whether the submission forces a global exit root update.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_force_update_global_exit_root(mut self, force: bool) -> Self {
        self.force_update_global_exit_root = force;
        self
    }

    /// Checks the invariants of the descriptor.
    pub fn validate(&self) -> Result<(), OperationError> {
        if self.source_network == self.destination_network {
            return Err(OperationError::SameNetwork(self.source_network));
        }

        Ok(())
    }
}
