//! Membership & Discovery Module
//!
//! Tracks which peers are alive by periodically polling an external peer
//! registry and diffing the result against the last known view. The watcher
//! does not gossip or probe peers itself; liveness is whatever the registry
//! reports, and the cluster only needs that view to be eventually consistent.
//!
//! ## Core Mechanisms
//! - **Fixed-delay sweeps**: one dedicated task queries the registry, waits
//!   a full interval after each completed sweep, and never overlaps itself.
//! - **View diffing**: newly seen peers dispatch join events, vanished peers
//!   dispatch leave events (one per sweep), and the local node's own first
//!   appearance dispatches a self-joined event last.
//! - **Rebalance deference**: sweeps are skipped entirely while the
//!   coordinator holds the rebalance flag.

pub mod registry;
pub mod watcher;

pub use registry::{HttpRegistry, PeerRegistry, StaticRegistry};
pub use watcher::MembershipWatcher;
