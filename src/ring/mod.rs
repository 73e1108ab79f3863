//! Consistent-Hash Ring Module
//!
//! Implements key placement for the cluster. Keys and node identifiers are
//! hashed into a shared 32-bit coordinate space; a key belongs to the node at
//! the smallest hash greater than or equal to its own, wrapping to the start
//! of the ring when no such node exists.
//!
//! ## Core Mechanisms
//! - **Clockwise-successor placement**: adding or removing one node only
//!   remaps the keys between that node and its predecessor.
//! - **Single position per node**: no virtual nodes. A node sits at exactly
//!   one hash; if two node ids ever collide under the hash, the first
//!   insertion wins and later attempts are no-ops.
//! - **Concurrent readers**: lookups take a read lock only. Structural
//!   mutation (add/remove) is serialised by the caller via the cluster's
//!   rebalance flag.

pub mod hashring;
pub mod types;

pub use hashring::{HashRing, hash_key};
pub use types::NodeInfo;

#[cfg(test)]
mod tests;
