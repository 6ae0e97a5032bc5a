//! Scalar types that identify networks, transactions and amounts.

use std::{fmt, str::FromStr};

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    constants::MAINNET_NETWORK_ID,
    errors::{AmountParseError, TxRefParseError},
};

/// Integer identifying a specific chain within the bridging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

impl NetworkId {
    /// The L1 side of the bridge.
    pub const MAINNET: NetworkId = NetworkId(MAINNET_NETWORK_ID);

    /// Returns `true` if this is the L1 network.
    pub const fn is_mainnet(&self) -> bool {
        self.0 == MAINNET_NETWORK_ID
    }
}

impl From<u32> for NetworkId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of a transaction on either side of the bridge.
///
/// This is the identity of a [`BridgeTransaction`](crate::record::BridgeTransaction) (the
/// source-chain hash) as well as of a [`ClaimTransaction`](crate::record::ClaimTransaction) (the
/// destination-chain hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(B256);

impl TxRef {
    /// Wraps a raw 32-byte hash.
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }

    /// Returns the underlying hash.
    pub const fn hash(&self) -> &B256 {
        &self.0
    }
}

impl From<B256> for TxRef {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; 32]> for TxRef {
    fn from(value: [u8; 32]) -> Self {
        Self(B256::from(value))
    }
}

impl FromStr for TxRef {
    type Err = TxRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s.trim()).map(Self).map_err(|_| TxRefParseError {
            input: s.to_string(),
        })
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token amount in the smallest denomination.
///
/// Backed by a 256-bit unsigned integer so any on-chain amount fits. It is parsed from and
/// serialized to its decimal representation, which is how the status API and callers express
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(U256);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(U256::ZERO);

    /// Wraps a raw 256-bit value.
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    pub const fn value(&self) -> U256 {
        self.0
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigit(c));
        }

        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|_| AmountParseError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The status API is not consistent about quoting amounts.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Num(n) => Ok(Amount::from(n)),
        }
    }
}
