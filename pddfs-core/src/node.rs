//! Per-node protocol state machine.
//!
//! One [`NodeCore`] exists per graph node. The runtime feeds it inbound
//! messages one at a time via [`NodeCore::handle`]; the returned
//! `(destination, message)` pairs are the only traffic the node ever emits.
//! The machine never performs I/O itself, which lets the model checker drive
//! the very same transitions the runtime does.
//!
//! A node starts with every neighbor as a candidate child. Mounting — the
//! root by [`NodeCore::bootstrap`], everyone else on their first DISCOVER —
//! removes the parent from the candidates and fans the adopted walk out to
//! the rest. Candidates then leave the set one by one, either by being
//! rejected (the edge closes a cycle) or by convergecasting TERMINATE once
//! their own subtree is complete. When every remaining child has terminated
//! the node is done.

use std::collections::BTreeSet;

use crate::error::ProtocolViolation;
use crate::message::Message;
use crate::path::{Precedence, TreePath};
use crate::rank::Rank;

/// Messages to transmit, in order.
pub type Outbound = Vec<(Rank, Message)>;

/// Protocol state of a single node.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NodeCore {
    rank: Rank,
    neighbors: BTreeSet<Rank>,
    /// Present once the node is attached to the tree.
    path: Option<TreePath>,
    parent: Option<Rank>,
    children: BTreeSet<Rank>,
    terminated: BTreeSet<Rank>,
    /// The current parent cut the link; never DISCOVER back across it.
    parent_rejected: bool,
}

impl NodeCore {
    #[must_use]
    pub fn new(rank: Rank, neighbors: BTreeSet<Rank>) -> Self {
        Self {
            rank,
            children: neighbors.clone(),
            neighbors,
            path: None,
            parent: None,
            terminated: BTreeSet::new(),
            parent_rejected: false,
        }
    }

    #[must_use]
    pub fn rank(&self) -> Rank {
        self.rank
    }

    #[must_use]
    pub fn parent(&self) -> Option<Rank> {
        self.parent
    }

    /// The best root→self walk known so far; `None` until mounted.
    #[must_use]
    pub fn path(&self) -> Option<&TreePath> {
        self.path.as_ref()
    }

    #[must_use]
    pub fn neighbors(&self) -> &BTreeSet<Rank> {
        &self.neighbors
    }

    #[must_use]
    pub fn children(&self) -> &BTreeSet<Rank> {
        &self.children
    }

    #[must_use]
    pub fn terminated_children(&self) -> &BTreeSet<Rank> {
        &self.terminated
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.path.is_some()
    }

    #[must_use]
    pub fn is_parent_rejected(&self) -> bool {
        self.parent_rejected
    }

    /// Mounts the root and opens the search with a DISCOVER to every
    /// neighbor. A no-op on non-root nodes, which mount on their first
    /// inbound DISCOVER instead.
    pub fn bootstrap(&mut self) -> Outbound {
        if !self.rank.is_root() || self.is_mounted() {
            return Vec::new();
        }
        self.path = Some(TreePath::root());
        self.fan_out()
    }

    /// Every remaining child has reported its subtree complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.terminated == self.children
    }

    /// Convergecast step once [`NodeCore::is_complete`] holds: TERMINATE to
    /// the parent, if there is one.
    #[must_use]
    pub fn finish(&self) -> Outbound {
        self.parent
            .map(|parent| (parent, Message::Terminate))
            .into_iter()
            .collect()
    }

    /// Applies one inbound message and returns the messages it provokes.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] when the message breaks a state
    /// invariant; the node must then abort.
    pub fn handle(&mut self, from: Rank, message: Message) -> Result<Outbound, ProtocolViolation> {
        if !self.neighbors.contains(&from) {
            return Err(ProtocolViolation::ForeignSender { from });
        }
        match message {
            Message::Discover(path) => self.on_discover(from, path),
            Message::Reject => {
                self.on_reject(from);
                Ok(Vec::new())
            }
            Message::Terminate => {
                self.on_terminate(from)?;
                Ok(Vec::new())
            }
        }
    }

    fn on_discover(
        &mut self,
        from: Rank,
        received: TreePath,
    ) -> Result<Outbound, ProtocolViolation> {
        if received.first() != Some(Rank::ROOT) {
            return Err(ProtocolViolation::PathNotRooted { from });
        }
        if received.last() != Some(self.rank) {
            return Err(ProtocolViolation::MisroutedPath {
                from,
                terminus: received.last(),
            });
        }

        let Some(current) = self.path.take() else {
            // First discovery: mount under the sender and keep searching.
            self.parent = Some(from);
            self.children.remove(&from);
            self.path = Some(received);
            return Ok(self.fan_out());
        };

        if self.parent == Some(from) {
            // The parent's own walk may have improved since we mounted; keep
            // the better of the two. No fan-out here: children pick the
            // improvement up through later traffic.
            self.path = Some(match current.precedence(&received) {
                Precedence::Received => received,
                Precedence::Current | Precedence::SharedPrefix => current,
            });
            return Ok(Vec::new());
        }

        match current.precedence(&received) {
            Precedence::Received => {
                // Re-root under the sender. The former parent now has a
                // better route through us and becomes a child — unless that
                // link was already cut.
                let mut out = Vec::new();
                if let Some(former) = self.parent.take() {
                    if !self.parent_rejected {
                        self.children.insert(former);
                        out.push((former, Message::Discover(received.fork(former))));
                    }
                }
                self.parent = Some(from);
                self.parent_rejected = false;
                self.children.remove(&from);
                self.path = Some(received);
                Ok(out)
            }
            Precedence::SharedPrefix => {
                // The walk re-enters our subtree: the edge to the sender and
                // the edge where the walk first left us close the same loop.
                // The larger-ranked endpoint loses; both ends of the loop
                // reach the same verdict on their own.
                let Some(reentry) = received.get(current.len()) else {
                    let violation = ProtocolViolation::ShortCycleWalk {
                        from,
                        walk_len: received.len(),
                        path_len: current.len(),
                    };
                    self.path = Some(current);
                    return Err(violation);
                };
                self.path = Some(current);
                let rejected = if reentry < from { from } else { reentry };
                self.children.remove(&rejected);
                Ok(vec![(rejected, Message::Reject)])
            }
            Precedence::Current => {
                // Ours is better; the sender should hang below us instead.
                let reply = Message::Discover(current.fork(from));
                self.path = Some(current);
                Ok(vec![(from, reply)])
            }
        }
    }

    fn on_reject(&mut self, from: Rank) {
        if self.parent == Some(from) {
            self.parent_rejected = true;
        } else {
            self.children.remove(&from);
        }
    }

    fn on_terminate(&mut self, from: Rank) -> Result<(), ProtocolViolation> {
        if !self.children.contains(&from) {
            return Err(ProtocolViolation::TerminateFromNonChild { from });
        }
        self.terminated.insert(from);
        Ok(())
    }

    /// DISCOVER the freshly adopted walk to every remaining candidate child.
    fn fan_out(&self) -> Outbound {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        self.children
            .iter()
            .map(|&child| (child, Message::Discover(path.fork(child))))
            .collect()
    }
}
