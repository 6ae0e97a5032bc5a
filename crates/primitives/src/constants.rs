//! Constants that are fixed by the bridge contracts.

/// Depth of the sparse merkle trees that back the local and rollup exit roots.
pub const EXIT_TREE_DEPTH: usize = 32;

/// The network identifier reserved for the L1 (mainnet) side of the bridge.
pub const MAINNET_NETWORK_ID: u32 = 0;

/// Bit in the global index that flags a deposit as originating from the mainnet exit tree.
pub const GLOBAL_INDEX_MAINNET_FLAG_BIT: usize = 64;
