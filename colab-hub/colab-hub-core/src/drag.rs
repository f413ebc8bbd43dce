//! Drag-and-drop reparenting as an explicit state machine.
//!
//! A session goes `Idle -> Dragging -> Idle`. Hovering validates the target and
//! reports the affordance to show; dropping only calls
//! [`TreeStore::move_node`] when the same target was hovered with
//! [`DropEffect::Move`]. Anything else resets the session without touching the
//! tree.

use crate::error::{HubError, HubResult};
use crate::tree::{NodeId, NodeKind, TreeStore};
use serde::Serialize;
use tracing::debug;

/// Where the pointer is when hovering or dropping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    Node(NodeId),
    /// Empty space of the tree view; equivalent to dropping on the root.
    Background,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DropEffect {
    Move,
    None,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotAFolder,
    OntoSelf,
    IntoDescendant,
    NotHovered,
    UnknownTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    Moved { node: NodeId, to: NodeId },
    Rejected(RejectReason),
    /// Drop arrived with no drag in progress.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging {
        node: NodeId,
        origin: NodeId,
        hovered: Option<(DropTarget, DropEffect)>,
    },
}

#[derive(Debug)]
pub struct DragSession {
    state: DragState,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DragSession {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Pick up `node` from `origin`. The root cannot be dragged.
    pub fn start(&mut self, store: &TreeStore, node: NodeId, origin: NodeId) -> HubResult<()> {
        if node == store.root() {
            return Err(HubError::Validation(
                "the root folder cannot be dragged".to_string(),
            ));
        }
        if !store.children(origin).contains(&node) {
            return Err(HubError::NotFound(format!(
                "node {node} is not a child of {origin}"
            )));
        }
        debug!(%node, %origin, "drag started");
        self.state = DragState::Dragging {
            node,
            origin,
            hovered: None,
        };
        Ok(())
    }

    /// Validate a hover over `target` and return the affordance to display.
    pub fn hover(&mut self, store: &TreeStore, target: DropTarget) -> DropEffect {
        let DragState::Dragging { node, origin, .. } = self.state else {
            return DropEffect::None;
        };
        let effect = match validate(store, node, target) {
            Ok(_) => DropEffect::Move,
            Err(_) => DropEffect::None,
        };
        self.state = DragState::Dragging {
            node,
            origin,
            hovered: Some((target, effect)),
        };
        effect
    }

    /// The pointer left the last hovered target.
    pub fn leave(&mut self) {
        if let DragState::Dragging { node, origin, .. } = self.state {
            self.state = DragState::Dragging {
                node,
                origin,
                hovered: None,
            };
        }
    }

    /// Drag ended without a drop.
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Finish the gesture. The session is back to `Idle` afterwards whatever
    /// the outcome.
    pub fn drop_on(&mut self, store: &mut TreeStore, target: DropTarget) -> HubResult<DropOutcome> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        let DragState::Dragging {
            node,
            origin,
            hovered,
        } = state
        else {
            return Ok(DropOutcome::Ignored);
        };
        if hovered != Some((target, DropEffect::Move)) {
            // a forced drop on an invalid or never-validated target is a no-op
            let reason = validate(store, node, target).err().unwrap_or(RejectReason::NotHovered);
            debug!(%node, ?reason, "drop rejected");
            return Ok(DropOutcome::Rejected(reason));
        }
        let to = match validate(store, node, target) {
            Ok(to) => to,
            Err(reason) => return Ok(DropOutcome::Rejected(reason)),
        };
        store.move_node(node, origin, to)?;
        Ok(DropOutcome::Moved { node, to })
    }
}

/// Resolve a drop target to the destination folder, or say why it is invalid.
fn validate(store: &TreeStore, node: NodeId, target: DropTarget) -> Result<NodeId, RejectReason> {
    let folder = match target {
        DropTarget::Background => return Ok(store.root()),
        DropTarget::Node(id) => id,
    };
    match store.kind(folder) {
        None => Err(RejectReason::UnknownTarget),
        Some(NodeKind::File) => Err(RejectReason::NotAFolder),
        Some(NodeKind::Folder) if folder == node => Err(RejectReason::OntoSelf),
        Some(NodeKind::Folder) if store.is_descendant(node, folder) => {
            Err(RejectReason::IntoDescendant)
        }
        Some(NodeKind::Folder) => Ok(folder),
    }
}
