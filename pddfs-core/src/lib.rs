//! Distributed depth-first search protocol core
//!
//! Builds a spanning DFS tree of an undirected connected graph by message
//! passing alone. Every graph node is an independent actor that exchanges
//! DISCOVER / REJECT / TERMINATE messages with its neighbors over reliable
//! FIFO point-to-point links; when the protocol quiesces, every node knows
//! its parent and its children in the unique depth-first tree rooted at
//! rank 0.
//!
//! # Architecture
//!
//! - [`NodeCore`]: the per-node state machine — consumes one inbound message
//!   at a time and returns the messages it provokes
//! - [`TreePath`]: an owned root→node walk with the depth-first precedence
//!   relation that decides which of two competing discoveries wins
//! - [`Message`]: the three-variant wire vocabulary
//!
//! This crate is pure: no I/O, no async, no clocks. The transition functions
//! exercised by the model checker in this crate's tests are the exact
//! functions the runtime drives.

#![warn(clippy::pedantic)]

mod error;
pub mod message;
pub mod node;
pub mod path;
pub mod rank;

pub use error::ProtocolViolation;
pub use message::Message;
pub use node::{NodeCore, Outbound};
pub use path::{Precedence, TreePath};
pub use rank::Rank;
