//! Scripted collaborators for the tracker tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use lxly_bridge_primitives::{
    claim::ClaimPayload,
    constants::EXIT_TREE_DEPTH,
    types::{Amount, NetworkId, TxRef},
};
use lxly_status_api::{StatusApiResult, StatusSource, TransactionRecord};

use crate::{
    errors::BridgeClientError,
    traits::{BridgeClient, BridgeRequest, ClaimRequest, TxHandle, TxReceipt},
};

pub(crate) const RECIPIENT: Address = Address::repeat_byte(0x11);

pub(crate) fn hash(prefix: u8, n: u8) -> TxRef {
    let mut bytes = [prefix; 32];
    bytes[31] = n;
    TxRef::from(bytes)
}

/// A status API record for `tx_ref` from network 0 to network 1.
pub(crate) fn observation(tx_ref: TxRef, status: &str) -> TransactionRecord {
    TransactionRecord {
        bridge_transaction_hash: tx_ref,
        status: status.to_string(),
        token: Address::ZERO,
        amount: Amount::from(10_000_000_000_000_000u64),
        source_network: NetworkId(0),
        destination_network: NetworkId(1),
        claim_transaction_hash: (status == "CLAIMED").then(|| hash(0xcc, 0)),
        deposit_count: Some(7),
        receiver_address: Some(RECIPIENT),
    }
}

#[derive(Debug)]
pub(crate) struct MockHandle {
    receipt: TxReceipt,
}

#[async_trait]
impl TxHandle for MockHandle {
    async fn tx_hash(&self) -> Result<TxRef, BridgeClientError> {
        Ok(self.receipt.tx_ref)
    }

    async fn receipt(&self) -> Result<TxReceipt, BridgeClientError> {
        Ok(self.receipt.clone())
    }
}

impl MockHandle {
    fn mined(tx_ref: TxRef, revert_reason: Option<String>) -> Self {
        Self {
            receipt: TxReceipt {
                tx_ref,
                success: revert_reason.is_none(),
                block_number: Some(1),
                revert_reason,
            },
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    nonce: u8,
    bridge_error: Option<BridgeClientError>,
    bridge_revert: Option<String>,
    claim_revert: Option<String>,
    ready: HashSet<TxRef>,
    claimed: HashSet<TxRef>,
    payload_owners: HashMap<U256, TxRef>,
    bridge_requests: Vec<BridgeRequest>,
    claim_requests: Vec<ClaimRequest>,
}

/// Both bridge contracts in one: deposits become claimable once marked ready and can be claimed
/// once.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        f(&mut self.state.lock().expect("mock chain lock poisoned"))
    }

    pub(crate) fn mark_ready(&self, tx_ref: TxRef) {
        self.with_state(|s| s.ready.insert(tx_ref));
    }

    pub(crate) fn fail_bridge(&self, err: BridgeClientError) {
        self.with_state(|s| s.bridge_error = Some(err));
    }

    pub(crate) fn revert_bridge(&self, reason: &str) {
        self.with_state(|s| s.bridge_revert = Some(reason.to_string()));
    }

    pub(crate) fn revert_claims(&self, reason: &str) {
        self.with_state(|s| s.claim_revert = Some(reason.to_string()));
    }

    pub(crate) fn bridge_requests(&self) -> Vec<BridgeRequest> {
        self.with_state(|s| s.bridge_requests.clone())
    }

    pub(crate) fn claim_requests(&self) -> Vec<ClaimRequest> {
        self.with_state(|s| s.claim_requests.clone())
    }
}

#[async_trait]
impl BridgeClient for MockChain {
    type Handle = MockHandle;

    async fn bridge(&self, request: &BridgeRequest) -> Result<MockHandle, BridgeClientError> {
        self.with_state(|s| {
            if let Some(err) = s.bridge_error.clone() {
                return Err(err);
            }

            s.bridge_requests.push(request.clone());
            s.nonce += 1;

            Ok(MockHandle::mined(hash(0xb0, s.nonce), s.bridge_revert.clone()))
        })
    }

    async fn claim(&self, request: &ClaimRequest) -> Result<MockHandle, BridgeClientError> {
        self.with_state(|s| {
            s.claim_requests.push(request.clone());

            let (bridge_tx_ref, broadcast) = match request {
                ClaimRequest::Asset {
                    bridge_tx_ref,
                    return_transaction,
                    ..
                } => (*bridge_tx_ref, !return_transaction),
                ClaimRequest::Message(payload) => {
                    let owner = s
                        .payload_owners
                        .get(&payload.global_index)
                        .ok_or_else(|| BridgeClientError::Reverted("InvalidSmtProof()".into()))?;
                    (*owner, true)
                }
            };

            if s.claimed.contains(&bridge_tx_ref) {
                return Err(BridgeClientError::Reverted("AlreadyClaimed()".into()));
            }

            if !s.ready.contains(&bridge_tx_ref) {
                return Err(BridgeClientError::ProofNotReady(
                    "global exit root not synced".into(),
                ));
            }

            s.nonce += 1;
            let claim_tx_ref = hash(0xc0, s.nonce);

            if let Some(reason) = s.claim_revert.clone() {
                return Ok(MockHandle::mined(claim_tx_ref, Some(reason)));
            }

            if broadcast {
                s.claimed.insert(bridge_tx_ref);
            }

            Ok(MockHandle::mined(claim_tx_ref, None))
        })
    }

    async fn build_claim_payload(
        &self,
        bridge_tx_ref: TxRef,
        source_network: NetworkId,
        bridge_index: u32,
    ) -> Result<ClaimPayload, BridgeClientError> {
        self.with_state(|s| {
            if !s.ready.contains(&bridge_tx_ref) {
                return Err(BridgeClientError::ProofNotReady(
                    "deposit not in rollup exit tree".into(),
                ));
            }

            let global_index = ClaimPayload::global_index_for(source_network, bridge_index);
            s.payload_owners.insert(global_index, bridge_tx_ref);

            Ok(ClaimPayload {
                smt_proof_local_exit_root: vec![B256::repeat_byte(1); EXIT_TREE_DEPTH],
                smt_proof_rollup_exit_root: vec![B256::repeat_byte(2); EXIT_TREE_DEPTH],
                global_index,
                mainnet_exit_root: B256::repeat_byte(3),
                rollup_exit_root: B256::repeat_byte(4),
                origin_network: source_network,
                origin_address: Address::ZERO,
                destination_network: NetworkId(1),
                destination_address: RECIPIENT,
                amount: Amount::from(1),
                metadata: Bytes::new(),
            })
        })
    }
}

type Response = StatusApiResult<Option<TransactionRecord>>;

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Response>,
    fallback: Option<Response>,
    calls: usize,
    users: Vec<Address>,
}

/// A status API that replays scripted responses per transaction.
///
/// Once a script runs out it repeats its fallback, or reports the transaction as not indexed.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedStatus {
    scripts: Arc<Mutex<HashMap<TxRef, Script>>>,
}

impl ScriptedStatus {
    fn with_script<R>(&self, tx_ref: TxRef, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut scripts = self.scripts.lock().expect("scripted status lock poisoned");
        f(scripts.entry(tx_ref).or_default())
    }

    pub(crate) fn script(&self, tx_ref: TxRef, responses: impl IntoIterator<Item = Response>) {
        self.with_script(tx_ref, |s| s.queue.extend(responses));
    }

    pub(crate) fn statuses(&self, tx_ref: TxRef, statuses: &[&str]) {
        self.script(
            tx_ref,
            statuses
                .iter()
                .map(|status| Ok(Some(observation(tx_ref, status)))),
        );
    }

    pub(crate) fn then_repeat(&self, tx_ref: TxRef, response: Response) {
        self.with_script(tx_ref, |s| s.fallback = Some(response));
    }

    pub(crate) fn calls(&self, tx_ref: TxRef) -> usize {
        self.with_script(tx_ref, |s| s.calls)
    }

    pub(crate) fn users(&self, tx_ref: TxRef) -> Vec<Address> {
        self.with_script(tx_ref, |s| s.users.clone())
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch(&self, tx_ref: TxRef, user_address: Address) -> Response {
        self.with_script(tx_ref, |s| {
            s.calls += 1;
            s.users.push(user_address);

            s.queue
                .pop_front()
                .or_else(|| s.fallback.clone())
                .unwrap_or(Ok(None))
        })
    }
}
