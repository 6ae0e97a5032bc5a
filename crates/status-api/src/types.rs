//! Wire types of the transaction-status API.

use std::{fmt, str::FromStr};

use alloy_primitives::Address;
use lxly_bridge_primitives::{
    errors::UnknownStateError,
    state::BridgeState,
    types::{Amount, NetworkId, TxRef},
};
use serde::{Deserialize, Serialize};

/// The deployments served by the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusNetwork {
    /// The test deployment of the bridge.
    Testnet,

    /// The production deployment of the bridge.
    Mainnet,
}

impl StatusNetwork {
    /// The path segment that selects this deployment.
    pub const fn as_path_segment(&self) -> &'static str {
        match self {
            StatusNetwork::Testnet => "testnet",
            StatusNetwork::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for StatusNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path_segment())
    }
}

impl FromStr for StatusNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            _ => Err(format!("unknown status network: {s}")),
        }
    }
}

/// A bridge transaction as reported by the status API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Source-chain hash of the bridge transaction.
    #[serde(alias = "transactionHash")]
    pub bridge_transaction_hash: TxRef,

    /// Raw status string, see [`TransactionRecord::state`].
    pub status: String,

    /// The bridged token.
    #[serde(alias = "tokenAddress")]
    pub token: Address,

    /// The bridged amount.
    pub amount: Amount,

    /// The network on which the operation was submitted.
    pub source_network: NetworkId,

    /// The network on which the operation is claimed.
    pub destination_network: NetworkId,

    /// Destination-chain hash of the claim, once claimed.
    #[serde(default)]
    pub claim_transaction_hash: Option<TxRef>,

    /// Deposit count assigned by the source bridge contract.
    #[serde(default)]
    pub deposit_count: Option<u32>,

    /// The recipient on the destination network.
    #[serde(default)]
    pub receiver_address: Option<Address>,
}

impl TransactionRecord {
    /// Maps the raw status onto the canonical lifecycle.
    pub fn state(&self) -> Result<BridgeState, UnknownStateError> {
        self.status.parse()
    }
}

/// Envelope of the `GET /transactions/{network}` response.
///
/// Entries are kept undecoded so that one malformed record does not hide the others.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsResponse {
    #[serde(alias = "data", default)]
    pub(crate) result: Vec<serde_json::Value>,
}
