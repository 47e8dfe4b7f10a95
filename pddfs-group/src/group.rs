//! Whole-group orchestration: wire, spawn, supervise, collect.

use core::fmt;

use error_stack::Report;
use futures::stream::{FuturesUnordered, StreamExt};
use pddfs_core::NodeCore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::runner::{NodeReport, run_node};
use crate::topology::Topology;
use crate::transport::wire;

/// The group did not complete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupError {
    /// A node failed; the rest of the group was cancelled.
    NodeFailed,
    /// A node task panicked.
    Panicked,
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupError::NodeFailed => f.write_str("a node aborted; the group was torn down"),
            GroupError::Panicked => f.write_str("a node task panicked"),
        }
    }
}

impl core::error::Error for GroupError {}

/// Runs one task per rank until the whole tree has converged, returning the
/// per-node reports in rank order.
///
/// Cancelling `cancel` aborts every node. The first node failure does the
/// same from the inside, and the error that started the teardown is the one
/// reported.
///
/// # Errors
///
/// [`GroupError`] when any node aborts or panics.
pub async fn run_group(
    topology: &Topology,
    cancel: CancellationToken,
) -> Result<Vec<NodeReport>, Report<GroupError>> {
    let mut tasks: FuturesUnordered<_> = wire(topology)
        .into_iter()
        .map(|link| {
            let core = NodeCore::new(link.rank(), topology.neighbors(link.rank()).clone());
            tokio::spawn(run_node(core, link, cancel.child_token()))
        })
        .collect();
    debug!(nodes = tasks.len(), "group started");

    let mut reports = Vec::with_capacity(topology.nodes());
    let mut failure: Option<Report<GroupError>> = None;

    while let Some(joined) = tasks.next().await {
        match joined {
            Ok(Ok(report)) => {
                debug!(rank = %report.rank, "node done");
                reports.push(report);
            }
            Ok(Err(report)) => {
                if failure.is_none() {
                    error!("node failed; tearing the group down");
                    failure = Some(report.change_context(GroupError::NodeFailed));
                }
                cancel.cancel();
            }
            Err(join_error) => {
                if failure.is_none() {
                    error!("node task panicked; tearing the group down");
                    failure = Some(
                        Report::new(GroupError::Panicked)
                            .attach_printable(join_error.to_string()),
                    );
                }
                cancel.cancel();
            }
        }
    }

    if let Some(report) = failure {
        return Err(report);
    }
    reports.sort_by_key(|report| report.rank);
    Ok(reports)
}
