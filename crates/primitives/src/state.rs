//! The canonical lifecycle of a bridge operation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::UnknownStateError;

/// Lifecycle state of a bridge operation as observed by the tracker.
///
/// The derived ordering is the lifecycle ordering: `Bridged < ReadyToClaim < Claimed`. Records
/// only ever move forward along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeState {
    /// The operation was accepted on the source chain but is not claimable yet.
    Bridged,

    /// The destination-chain proof is available and the asset or message may be claimed.
    ReadyToClaim,

    /// The claim transaction is confirmed on the destination chain.
    ///
    /// This is the only terminal state.
    Claimed,
}

/// Outcome of offering an observed state to a record in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The observation moves the record forward to the contained state.
    Applied(BridgeState),

    /// The observation matches the current state.
    Unchanged,

    /// The observation is behind the current state and must be discarded.
    Regressed,
}

impl BridgeState {
    /// Returns `true` if no further transition is possible from this state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Claimed)
    }

    /// Decides what to do with an `observed` state given that the record is currently `self`.
    pub fn advance(&self, observed: BridgeState) -> Transition {
        match observed.cmp(self) {
            std::cmp::Ordering::Greater => Transition::Applied(observed),
            std::cmp::Ordering::Equal => Transition::Unchanged,
            std::cmp::Ordering::Less => Transition::Regressed,
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BridgeState::Bridged => "BRIDGED",
            BridgeState::ReadyToClaim => "READY_TO_CLAIM",
            BridgeState::Claimed => "CLAIMED",
        };

        write!(f, "{s}")
    }
}

impl FromStr for BridgeState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "BRIDGED" => Ok(BridgeState::Bridged),
            "READY_TO_CLAIM" => Ok(BridgeState::ReadyToClaim),
            "CLAIMED" => Ok(BridgeState::Claimed),
            _ => Err(UnknownStateError(s.to_string())),
        }
    }
}
