//! The three-message wire vocabulary.

use crate::path::TreePath;

/// One message between neighboring nodes.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Message {
    /// "Adopt me as your parent": carries the proposed root→destination
    /// walk, whose last element is the destination's own rank.
    Discover(TreePath),
    /// "The edge between us is not a tree edge."
    Reject,
    /// Convergecast from child to parent: "my subtree is complete."
    Terminate,
}

impl Message {
    /// Tag name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Discover(_) => "DISCOVER",
            Message::Reject => "REJECT",
            Message::Terminate => "TERMINATE",
        }
    }
}
