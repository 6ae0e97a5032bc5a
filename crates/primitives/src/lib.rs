//! This crate contains the data model shared by the bridge transaction tracker, the status API
//! client and the CLI.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod claim;
pub mod constants;
pub mod errors;
pub mod operation;
pub mod record;
pub mod state;
pub mod types;

/// Re-exports of the types that most consumers need.
pub mod prelude {
    pub use crate::{
        claim::ClaimPayload,
        errors::{AmountParseError, OperationError, TxRefParseError, UnknownStateError},
        operation::{BridgeOperation, BridgePayload},
        record::{BridgeTransaction, ClaimTransaction},
        state::{BridgeState, Transition},
        types::{Amount, NetworkId, TxRef},
    };
}
