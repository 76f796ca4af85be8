//! Shared data structures for the IPv6 health engine
//!
//! - `network`: per-interface addressing snapshots, default route, prefixes
//! - `verdict`: health verdicts, reason codes, prefix history transitions

mod network;
mod verdict;

pub use network::*;
pub use verdict::*;
