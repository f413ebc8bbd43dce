use super::NodeId;
use serde::{Deserialize, Serialize};

/// A single user-visible action against a tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TreeCommand {
    CreateFile { parent: NodeId, name: String },
    CreateFolder { parent: NodeId, name: String },
    Rename { node: NodeId, name: String },
    EditContent { node: NodeId, content: String },
    Delete { node: NodeId, parent: NodeId },
    Move { node: NodeId, from: NodeId, to: NodeId },
    Copy { node: NodeId },
    Paste { parent: NodeId },
}

impl TreeCommand {
    /// Whether applying the command changes the tree (and so needs a save).
    pub fn is_mutation(&self) -> bool {
        !matches!(self, TreeCommand::Copy { .. })
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "node", rename_all = "snake_case")]
pub enum CommandOutcome {
    Created(NodeId),
    Renamed,
    ContentUpdated,
    Deleted,
    Moved,
    Copied,
    Pasted(NodeId),
}

impl CommandOutcome {
    /// The node brought into existence by the command, if any.
    pub fn created_node(&self) -> Option<NodeId> {
        match self {
            CommandOutcome::Created(id) | CommandOutcome::Pasted(id) => Some(*id),
            _ => None,
        }
    }
}
