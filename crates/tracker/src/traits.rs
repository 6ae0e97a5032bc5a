//! The on-chain collaborators the tracker submits through.
//!
//! The tracker never signs, encodes or broadcasts transactions itself; it hands fully described
//! requests to a [`BridgeClient`] and works with the [`TxHandle`] it gets back.

use alloy_primitives::Address;
use async_trait::async_trait;
use lxly_bridge_primitives::{
    claim::ClaimPayload,
    operation::{BridgeOperation, BridgePayload},
    types::{Amount, NetworkId, TxRef},
};

use crate::errors::BridgeClientError;

/// A submission to the source network's bridge contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    /// The network whose bridge contract is called.
    pub source_network: NetworkId,

    /// The network the asset or message is bound for.
    pub destination_network: NetworkId,

    /// The bridged token, the zero address being the native gas token.
    pub token: Address,

    /// The bridged amount.
    pub amount: Amount,

    /// The recipient on the destination network.
    pub recipient: Address,

    /// Asset-only or bridge-and-call payload.
    pub payload: BridgePayload,

    /// Whether the global exit root is updated along with the submission.
    pub force_update_global_exit_root: bool,
}

impl From<&BridgeOperation> for BridgeRequest {
    fn from(operation: &BridgeOperation) -> Self {
        Self {
            source_network: operation.source_network,
            destination_network: operation.destination_network,
            token: operation.token,
            amount: operation.amount,
            recipient: operation.recipient,
            payload: operation.payload.clone(),
            force_update_global_exit_root: operation.force_update_global_exit_root,
        }
    }
}

/// A claim on the destination network's bridge contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRequest {
    /// Claim an asset. The collaborator derives the proof from the bridge transaction itself.
    Asset {
        /// The source-chain hash of the bridge transaction.
        bridge_tx_ref: TxRef,

        /// The network the bridge transaction was submitted on.
        source_network: NetworkId,

        /// Asks the collaborator to prepare the claim without broadcasting it.
        return_transaction: bool,
    },

    /// Claim a message with a payload built by
    /// [`BridgeClient::build_claim_payload`].
    Message(Box<ClaimPayload>),
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Hash of the mined transaction.
    pub tx_ref: TxRef,

    /// Whether the transaction executed successfully.
    pub success: bool,

    /// Block the transaction was included in, if reported.
    pub block_number: Option<u64>,

    /// Raw revert reason of a failed transaction, if the node reports one.
    pub revert_reason: Option<String>,
}

/// A transaction handed to the network.
#[async_trait]
pub trait TxHandle: Send + Sync {
    /// The hash the transaction is known under.
    async fn tx_hash(&self) -> Result<TxRef, BridgeClientError>;

    /// Waits until the transaction is mined and returns its receipt.
    async fn receipt(&self) -> Result<TxReceipt, BridgeClientError>;
}

/// Submits bridge and claim transactions on behalf of the tracker.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Handle to a submitted transaction.
    type Handle: TxHandle;

    /// Calls the bridge entry point on the source network.
    async fn bridge(&self, request: &BridgeRequest) -> Result<Self::Handle, BridgeClientError>;

    /// Calls the claim entry point on the destination network.
    async fn claim(&self, request: &ClaimRequest) -> Result<Self::Handle, BridgeClientError>;

    /// Assembles the proof material needed to claim the deposit with the given count.
    ///
    /// Fails with [`BridgeClientError::ProofNotReady`] while the destination network cannot
    /// verify the deposit yet.
    async fn build_claim_payload(
        &self,
        bridge_tx_ref: TxRef,
        source_network: NetworkId,
        bridge_index: u32,
    ) -> Result<ClaimPayload, BridgeClientError>;
}
