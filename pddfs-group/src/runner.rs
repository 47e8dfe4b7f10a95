//! Single-node event loop.

use core::fmt;
use std::collections::BTreeSet;

use error_stack::{Report, ResultExt};
use pddfs_core::{NodeCore, Outbound, Rank};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::transport::NodeLink;

/// Final standing of one node, produced when its subtree completes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeReport {
    pub rank: Rank,
    pub parent: Option<Rank>,
    pub children: BTreeSet<Rank>,
    /// Messages this node processed before completing.
    pub messages: usize,
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: DONE - Children: [", self.rank)?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str("]")
    }
}

/// Why a node stopped without completing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeError {
    /// An inbound message broke a protocol invariant.
    Protocol { rank: Rank },
    /// The delivery fabric failed underneath the node.
    Transport { rank: Rank },
    /// The group was cancelled.
    Aborted { rank: Rank },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Protocol { rank } => write!(f, "node {rank}: protocol violation"),
            NodeError::Transport { rank } => write!(f, "node {rank}: transport failure"),
            NodeError::Aborted { rank } => write!(f, "node {rank}: aborted"),
        }
    }
}

impl core::error::Error for NodeError {}

/// Drives one node to completion: bootstrap (root only), then receive,
/// dispatch, transmit, until every remaining child has terminated. On
/// completion the convergecast TERMINATE goes to the parent and the final
/// standing is returned.
///
/// # Errors
///
/// [`NodeError`] when a message violates the protocol, the fabric fails, or
/// `cancel` fires.
#[instrument(skip_all, fields(rank = %core.rank()))]
pub async fn run_node<L: NodeLink>(
    mut core: NodeCore,
    mut link: L,
    cancel: CancellationToken,
) -> Result<NodeReport, Report<NodeError>> {
    let rank = core.rank();
    debug!(neighbors = core.neighbors().len(), "node started");

    transmit(&mut link, rank, core.bootstrap())?;
    let mut messages = 0_usize;

    // A neighborless root is complete before the first message arrives.
    while !core.is_complete() {
        let envelope = select! {
            // teardown outranks pending traffic
            biased;
            () = cancel.cancelled() => {
                debug!("aborted");
                return Err(Report::new(NodeError::Aborted { rank }));
            }
            received = link.recv() => {
                received.change_context(NodeError::Transport { rank })?
            }
        };
        messages += 1;
        trace!(src = %envelope.src, kind = envelope.msg.kind(), "dispatch");
        let outbound = core
            .handle(envelope.src, envelope.msg)
            .change_context(NodeError::Protocol { rank })?;
        transmit(&mut link, rank, outbound)?;
    }

    transmit(&mut link, rank, core.finish())?;
    debug!(messages, "subtree complete");

    Ok(NodeReport {
        rank,
        parent: core.parent(),
        children: core.children().clone(),
        messages,
    })
}

fn transmit<L: NodeLink>(
    link: &mut L,
    rank: Rank,
    outbound: Outbound,
) -> Result<(), Report<NodeError>> {
    for (to, msg) in outbound {
        trace!(%to, kind = msg.kind(), "send");
        link.send(to, msg)
            .change_context(NodeError::Transport { rank })?;
    }
    Ok(())
}
