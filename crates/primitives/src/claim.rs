//! The argument structure of the destination contract's claim entry points.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{EXIT_TREE_DEPTH, GLOBAL_INDEX_MAINNET_FLAG_BIT},
    types::{Amount, NetworkId},
};

/// Proof material and metadata required to claim a bridged asset or message.
///
/// This is produced by the proof-building collaborator and consumed by the claim collaborator.
/// The fields are in the positional order of the destination contract's claim entry point; this
/// crate never computes proofs or exit roots itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    /// Sibling path of the deposit in the local exit tree of the origin network.
    pub smt_proof_local_exit_root: Vec<B256>,

    /// Sibling path of the origin network's local exit root in the rollup exit tree.
    pub smt_proof_rollup_exit_root: Vec<B256>,

    /// Global index of the deposit, see [`ClaimPayload::global_index_for`].
    pub global_index: U256,

    /// Mainnet exit root the proofs are checked against.
    pub mainnet_exit_root: B256,

    /// Rollup exit root the proofs are checked against.
    pub rollup_exit_root: B256,

    /// Network on which the bridged token originates.
    pub origin_network: NetworkId,

    /// Token address on the origin network (or the message sender for message claims).
    pub origin_address: Address,

    /// Network on which the claim is executed.
    pub destination_network: NetworkId,

    /// Recipient on the destination network.
    pub destination_address: Address,

    /// The bridged amount.
    pub amount: Amount,

    /// Token metadata for asset claims, call data for message claims.
    pub metadata: Bytes,
}

impl ClaimPayload {
    /// Computes the global index of a deposit.
    ///
    /// Deposits from the L1 set the mainnet flag bit and carry only the local index. Deposits
    /// from a rollup carry the rollup index (network id minus one) above the 32-bit local index.
    pub fn global_index_for(source_network: NetworkId, bridge_index: u32) -> U256 {
        let local = U256::from(bridge_index);

        if source_network.is_mainnet() {
            (U256::from(1u8) << GLOBAL_INDEX_MAINNET_FLAG_BIT) | local
        } else {
            let rollup_index = U256::from(source_network.0 - 1);
            (rollup_index << 32) | local
        }
    }

    /// Returns `true` if both sibling paths have the depth of the exit trees.
    pub fn has_complete_proofs(&self) -> bool {
        self.smt_proof_local_exit_root.len() == EXIT_TREE_DEPTH
            && self.smt_proof_rollup_exit_root.len() == EXIT_TREE_DEPTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_index_sets_mainnet_flag() {
        let index = ClaimPayload::global_index_for(NetworkId::MAINNET, 7);

        assert_eq!(index, (U256::from(1u8) << 64) + U256::from(7u8));
    }

    #[test]
    fn global_index_encodes_rollup_index() {
        let index = ClaimPayload::global_index_for(NetworkId(2), 5);

        assert_eq!(index, (U256::from(1u8) << 32) + U256::from(5u8));
        assert!(!index.bit(64));
    }

    #[test]
    fn proof_depth_is_checked() {
        let payload = ClaimPayload {
            smt_proof_local_exit_root: vec![B256::ZERO; EXIT_TREE_DEPTH],
            smt_proof_rollup_exit_root: vec![B256::ZERO; EXIT_TREE_DEPTH - 1],
            global_index: U256::ZERO,
            mainnet_exit_root: B256::ZERO,
            rollup_exit_root: B256::ZERO,
            origin_network: NetworkId(0),
            origin_address: Address::ZERO,
            destination_network: NetworkId(1),
            destination_address: Address::ZERO,
            amount: Amount::ZERO,
            metadata: Bytes::new(),
        };

        assert!(!payload.has_complete_proofs());
    }
}
