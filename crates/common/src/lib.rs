//! Reusable utilities shared by the tracker binaries and tests, such as initializing the tracing
//! framework.

pub mod logging;

// Re-export tracing crate for convenience.
pub use tracing;
