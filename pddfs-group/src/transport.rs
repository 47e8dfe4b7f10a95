//! Point-to-point FIFO delivery fabric for a process group.
//!
//! Every node owns one inbox and a sender handle per neighbor; channels
//! exist only along graph edges, so a node can reach exactly the peers the
//! topology allows. Delivery is reliable and FIFO per ordered `(src, dst)`
//! pair — the guarantee the protocol's race resolution leans on — and sends
//! never block the caller.

use core::fmt;
use std::collections::BTreeMap;

use pddfs_core::{Message, Rank};
use tokio::sync::mpsc;

use crate::topology::Topology;

/// One inbound message with its sender.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub src: Rank,
    pub msg: Message,
}

/// Fault in the delivery fabric. Fatal: the group is torn down.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// The local inbox closed while the node was still running: every peer
    /// endpoint is gone.
    Disconnected,
    /// Attempted send to a rank this endpoint is not wired to.
    NoRoute { to: Rank },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Disconnected => f.write_str("all peer endpoints are gone"),
            TransportError::NoRoute { to } => write!(f, "no channel to rank {to}"),
        }
    }
}

impl core::error::Error for TransportError {}

/// Per-node endpoint onto the group's delivery fabric.
#[expect(async_fn_in_trait)]
pub trait NodeLink {
    /// Waits for the next inbound message.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] when no message can ever arrive again.
    async fn recv(&mut self) -> Result<Envelope, TransportError>;

    /// Queues `msg` for delivery to `to` and returns immediately.
    ///
    /// # Errors
    ///
    /// [`TransportError::NoRoute`] when `to` is not wired to this endpoint.
    fn send(&mut self, to: Rank, msg: Message) -> Result<(), TransportError>;
}

/// Channel-backed [`NodeLink`]: an unbounded inbox plus one sender per
/// neighbor.
#[derive(Debug)]
pub struct ChannelLink {
    rank: Rank,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    peers: BTreeMap<Rank, mpsc::UnboundedSender<Envelope>>,
}

impl ChannelLink {
    /// The rank this endpoint belongs to.
    #[must_use]
    pub fn rank(&self) -> Rank {
        self.rank
    }
}

impl NodeLink for ChannelLink {
    async fn recv(&mut self) -> Result<Envelope, TransportError> {
        self.inbox.recv().await.ok_or(TransportError::Disconnected)
    }

    fn send(&mut self, to: Rank, msg: Message) -> Result<(), TransportError> {
        let peer = self.peers.get(&to).ok_or(TransportError::NoRoute { to })?;
        // A peer that already completed has torn down its inbox; late
        // traffic to an exited process falls on the floor.
        let _ = peer.send(Envelope {
            src: self.rank,
            msg,
        });
        Ok(())
    }
}

/// Wires the fabric for a whole group: one link per rank, with channels laid
/// only along the topology's edges.
#[must_use]
pub fn wire(topology: &Topology) -> Vec<ChannelLink> {
    let (senders, inboxes): (Vec<_>, Vec<_>) =
        topology.ranks().map(|_| mpsc::unbounded_channel()).unzip();

    topology
        .ranks()
        .zip(inboxes)
        .map(|(rank, inbox)| ChannelLink {
            rank,
            inbox,
            peers: topology
                .neighbors(rank)
                .iter()
                .map(|&peer| (peer, senders[peer.index()].clone()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_fabric() -> Vec<ChannelLink> {
        let topology = Topology::from_pairs(2, &[(0, 1)]).unwrap();
        wire(&topology)
    }

    #[tokio::test]
    async fn messages_arrive_in_send_order() {
        let mut links = two_node_fabric();
        let mut right = links.pop().unwrap();
        let mut left = links.pop().unwrap();

        left.send(Rank(1), Message::Reject).unwrap();
        left.send(Rank(1), Message::Terminate).unwrap();

        assert_eq!(
            right.recv().await.unwrap(),
            Envelope {
                src: Rank(0),
                msg: Message::Reject,
            }
        );
        assert_eq!(
            right.recv().await.unwrap(),
            Envelope {
                src: Rank(0),
                msg: Message::Terminate,
            }
        );
    }

    #[tokio::test]
    async fn only_edges_are_wired() {
        let topology = Topology::from_pairs(3, &[(0, 1)]).unwrap();
        let mut links = wire(&topology);
        let err = links[0].send(Rank(2), Message::Reject).unwrap_err();
        assert_eq!(err, TransportError::NoRoute { to: Rank(2) });
    }

    #[tokio::test]
    async fn send_to_an_exited_peer_is_dropped() {
        let mut links = two_node_fabric();
        let right = links.pop().unwrap();
        let mut left = links.pop().unwrap();

        drop(right);
        assert!(left.send(Rank(1), Message::Terminate).is_ok());
    }

    #[tokio::test]
    async fn recv_fails_once_every_peer_is_gone() {
        let mut links = two_node_fabric();
        let right = links.pop().unwrap();
        let left = links.pop().unwrap();

        drop(left);
        let mut right = right;
        assert_eq!(right.recv().await.unwrap_err(), TransportError::Disconnected);
    }
}
