//! The seam between the tracker and whatever reports transaction status.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use lxly_bridge_primitives::types::TxRef;

use crate::{errors::StatusApiResult, types::TransactionRecord};

/// Something that can report the status of a bridge transaction.
///
/// Implementations must be stateless per request so that they can be shared by any number of
/// concurrent tracking loops.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Returns the record of `tx_ref` among the transactions of `user_address`.
    ///
    /// `Ok(None)` means the transaction is not indexed yet, which is not an error.
    async fn fetch(
        &self,
        tx_ref: TxRef,
        user_address: Address,
    ) -> StatusApiResult<Option<TransactionRecord>>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch(
        &self,
        tx_ref: TxRef,
        user_address: Address,
    ) -> StatusApiResult<Option<TransactionRecord>> {
        (**self).fetch(tx_ref, user_address).await
    }
}
