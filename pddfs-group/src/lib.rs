//! Group runtime for the distributed DFS protocol.
//!
//! Hosts one task per graph node, wired together by a reliable FIFO channel
//! fabric that only follows graph edges. The bootstrap side loads the
//! topology from a symmetric edge list; the runner drives each node's
//! [`pddfs_core::NodeCore`] until its subtree completes; the group layer
//! spawns, supervises, and collects.

#![warn(clippy::pedantic)]

pub mod group;
pub mod random;
pub mod runner;
pub mod topology;
pub mod transport;

pub use group::{GroupError, run_group};
pub use random::{ErdosRenyi, SampleError, symmetric_edge_list};
pub use runner::{NodeError, NodeReport, run_node};
pub use topology::{Topology, TopologyError};
pub use transport::{ChannelLink, Envelope, NodeLink, TransportError, wire};
