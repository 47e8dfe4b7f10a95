//! Protocol violations.

use core::fmt;

use crate::rank::Rank;

/// A received message broke a protocol invariant.
///
/// There is no local recovery: the offended node aborts and the whole group
/// is torn down. Partial output after a violation is not meaningful.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolViolation {
    /// A message arrived from a rank that is not a neighbor.
    ForeignSender { from: Rank },
    /// A DISCOVER walk was empty or did not start at the root.
    PathNotRooted { from: Rank },
    /// A DISCOVER walk did not terminate at the receiving rank.
    MisroutedPath { from: Rank, terminus: Option<Rank> },
    /// A cycle-closing walk was no longer than the local path, leaving the
    /// re-entry rank undefined.
    ShortCycleWalk {
        from: Rank,
        walk_len: usize,
        path_len: usize,
    },
    /// TERMINATE arrived from a rank that is not a current child.
    TerminateFromNonChild { from: Rank },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::ForeignSender { from } => {
                write!(f, "message from non-neighbor rank {from}")
            }
            ProtocolViolation::PathNotRooted { from } => {
                write!(f, "DISCOVER from {from} with a walk that does not start at the root")
            }
            ProtocolViolation::MisroutedPath { from, terminus } => match terminus {
                Some(terminus) => write!(
                    f,
                    "DISCOVER from {from} terminates at {terminus} instead of the receiver"
                ),
                None => write!(f, "DISCOVER from {from} with an empty walk"),
            },
            ProtocolViolation::ShortCycleWalk {
                from,
                walk_len,
                path_len,
            } => write!(
                f,
                "cycle walk from {from} has {walk_len} ranks but the local path has {path_len}"
            ),
            ProtocolViolation::TerminateFromNonChild { from } => {
                write!(f, "TERMINATE from {from}, which is not a current child")
            }
        }
    }
}

impl core::error::Error for ProtocolViolation {}
