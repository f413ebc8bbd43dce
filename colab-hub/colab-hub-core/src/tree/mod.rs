//! In-memory folder/file hierarchy.
//!
//! Nodes live in an arena keyed by [`NodeId`] with parent links, so every node
//! has exactly one owner at any time. The nested [`TreeNode`] form carries no
//! identity; it is what gets persisted and what the clipboard holds.

use crate::error::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

pub mod command;

pub use command::{CommandOutcome, TreeCommand};

pub const ROOT_NAME: &str = "Root";

/// Identity of a node inside one [`TreeStore`]. Not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

/// Owned, id-free form of a subtree. Serializes as
/// `{"name", "type": "folder", "children"}` or `{"name", "type": "file", "content"}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Folder {
        name: String,
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        #[serde(default)]
        content: String,
    },
}

impl TreeNode {
    pub fn empty_root() -> Self {
        TreeNode::Folder {
            name: ROOT_NAME.to_string(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TreeNode::Folder { .. } => NodeKind::Folder,
            TreeNode::File { .. } => NodeKind::File,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Folder { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }
}

enum Body {
    Folder(Vec<NodeId>),
    File(String),
}

struct Node {
    name: String,
    parent: Option<NodeId>,
    body: Body,
}

/// Arena-backed tree rooted at a single folder.
pub struct TreeStore {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    dirty: bool,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    /// Fresh store holding only an empty `Root` folder.
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                name: ROOT_NAME.to_string(),
                parent: None,
                body: Body::Folder(Vec::new()),
            },
        );
        Self {
            nodes,
            root,
            dirty: false,
        }
    }

    /// Build a store from a persisted document. Every node gets a new id.
    pub fn from_document(doc: &TreeNode) -> HubResult<Self> {
        if doc.kind() != NodeKind::Folder {
            return Err(HubError::Validation(
                "tree root must be a folder".to_string(),
            ));
        }
        let mut store = Self {
            nodes: HashMap::new(),
            root: NodeId::new(),
            dirty: false,
        };
        store.root = store.insert_document(doc, None);
        Ok(store)
    }

    pub fn to_document(&self) -> TreeNode {
        // the root is always present
        self.subtree(self.root).unwrap_or_else(TreeNode::empty_root)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| match n.body {
            Body::Folder(_) => NodeKind::Folder,
            Body::File(_) => NodeKind::File,
        })
    }

    /// Children of a folder in insertion order. Empty for files.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(&id).map(|n| &n.body) {
            Some(Body::Folder(children)) => children,
            _ => &[],
        }
    }

    pub fn content(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(&id).map(|n| &n.body) {
            Some(Body::File(content)) => Some(content),
            _ => None,
        }
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Return whether the store has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag after a successful save.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Resolve a child-index path from the root. `[]` is the root itself.
    pub fn resolve_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for &idx in path {
            current = *self.children(current).get(idx)?;
        }
        Some(current)
    }

    /// Child-index path from the root to `id`.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<usize>> {
        if !self.contains(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            let idx = self.children(parent).iter().position(|c| *c == current)?;
            path.push(idx);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// True when `candidate` lies strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool {
        let mut current = self.parent_of(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// `id` followed by every node below it, depth first.
    pub fn descendant_ids(&self, id: NodeId) -> Vec<NodeId> {
        fn gather(store: &TreeStore, id: NodeId, out: &mut Vec<NodeId>) {
            out.push(id);
            for child in store.children(id) {
                gather(store, *child, out);
            }
        }
        let mut ids = Vec::new();
        if self.contains(id) {
            gather(self, id, &mut ids);
        }
        ids
    }

    /// Owned copy of the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> Option<TreeNode> {
        let node = self.nodes.get(&id)?;
        Some(match &node.body {
            Body::Folder(children) => TreeNode::Folder {
                name: node.name.clone(),
                children: children.iter().filter_map(|c| self.subtree(*c)).collect(),
            },
            Body::File(content) => TreeNode::File {
                name: node.name.clone(),
                content: content.clone(),
            },
        })
    }

    pub fn create_file(&mut self, parent: NodeId, name: impl Into<String>) -> HubResult<NodeId> {
        let doc = TreeNode::File {
            name: name.into(),
            content: String::new(),
        };
        self.create(parent, doc)
    }

    pub fn create_folder(&mut self, parent: NodeId, name: impl Into<String>) -> HubResult<NodeId> {
        let doc = TreeNode::Folder {
            name: name.into(),
            children: Vec::new(),
        };
        self.create(parent, doc)
    }

    fn create(&mut self, parent: NodeId, doc: TreeNode) -> HubResult<NodeId> {
        validate_name(doc.name())?;
        self.folder_children(parent)?;
        let id = self.attach(&doc, parent)?;
        debug!(%id, %parent, name = doc.name(), "created node");
        Ok(id)
    }

    pub fn rename(&mut self, id: NodeId, new_name: impl Into<String>) -> HubResult<()> {
        let new_name = new_name.into();
        validate_name(&new_name)?;
        if id == self.root {
            return Err(HubError::Validation(
                "the root folder cannot be renamed".to_string(),
            ));
        }
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| HubError::NotFound(format!("node {id}")))?;
        node.name = new_name;
        self.mark_dirty();
        Ok(())
    }

    /// Replace the content of a file.
    pub fn edit_content(&mut self, id: NodeId, content: impl Into<String>) -> HubResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| HubError::NotFound(format!("node {id}")))?;
        match &mut node.body {
            Body::File(existing) => *existing = content.into(),
            Body::Folder(_) => {
                return Err(HubError::Validation(format!(
                    "\"{}\" is a folder and has no content",
                    node.name
                )))
            }
        }
        self.mark_dirty();
        Ok(())
    }

    /// Remove `id` (and everything below it) from `parent`'s children.
    pub fn delete_node(&mut self, id: NodeId, parent: NodeId) -> HubResult<()> {
        let children = self.folder_children_mut(parent)?;
        let idx = children
            .iter()
            .position(|c| *c == id)
            .ok_or_else(|| HubError::NotFound(format!("node {id} is not a child of {parent}")))?;
        children.remove(idx);
        for gone in self.descendant_ids(id) {
            self.nodes.remove(&gone);
        }
        self.mark_dirty();
        debug!(%id, %parent, "deleted node");
        Ok(())
    }

    /// Detach `id` from `from` and append it to `to`. Moving within the same
    /// folder sends the node to the end.
    pub fn move_node(&mut self, id: NodeId, from: NodeId, to: NodeId) -> HubResult<()> {
        if !self.contains(id) {
            return Err(HubError::NotFound(format!("node {id}")));
        }
        // perform invariant checks before mutating anything
        self.folder_children(to)?;
        if id == to || self.is_descendant(id, to) {
            let name = self.name(id).unwrap_or_default();
            return Err(HubError::Cycle(format!(
                "cannot move \"{name}\" into itself or one of its descendants"
            )));
        }
        let source = self.folder_children_mut(from)?;
        let idx = source
            .iter()
            .position(|c| *c == id)
            .ok_or_else(|| HubError::NotFound(format!("node {id} is not a child of {from}")))?;
        source.remove(idx);
        self.folder_children_mut(to)?.push(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(to);
        }
        self.mark_dirty();
        debug!(%id, %from, %to, "moved node");
        Ok(())
    }

    /// Deep clone of the subtree at `id`, sharing no identity with the source.
    pub fn copy(&self, id: NodeId) -> HubResult<TreeNode> {
        self.subtree(id)
            .ok_or_else(|| HubError::NotFound(format!("node {id}")))
    }

    /// Append a fresh instance of `clone` to `target`'s children.
    pub fn paste(&mut self, clone: &TreeNode, target: NodeId) -> HubResult<NodeId> {
        self.folder_children(target)?;
        let id = self.attach(clone, target)?;
        debug!(%id, %target, "pasted subtree");
        Ok(id)
    }

    /// Run one command against the store. `clipboard` holds the last copied
    /// subtree between commands.
    pub fn apply(
        &mut self,
        command: TreeCommand,
        clipboard: &mut Option<TreeNode>,
    ) -> HubResult<CommandOutcome> {
        match command {
            TreeCommand::CreateFile { parent, name } => {
                self.create_file(parent, name).map(CommandOutcome::Created)
            }
            TreeCommand::CreateFolder { parent, name } => {
                self.create_folder(parent, name).map(CommandOutcome::Created)
            }
            TreeCommand::Rename { node, name } => {
                self.rename(node, name).map(|_| CommandOutcome::Renamed)
            }
            TreeCommand::EditContent { node, content } => self
                .edit_content(node, content)
                .map(|_| CommandOutcome::ContentUpdated),
            TreeCommand::Delete { node, parent } => {
                self.delete_node(node, parent).map(|_| CommandOutcome::Deleted)
            }
            TreeCommand::Move { node, from, to } => {
                self.move_node(node, from, to).map(|_| CommandOutcome::Moved)
            }
            TreeCommand::Copy { node } => {
                *clipboard = Some(self.copy(node)?);
                Ok(CommandOutcome::Copied)
            }
            TreeCommand::Paste { parent } => {
                let clone = clipboard
                    .as_ref()
                    .ok_or_else(|| HubError::InvalidState("clipboard is empty".to_string()))?;
                self.paste(clone, parent).map(CommandOutcome::Pasted)
            }
        }
    }

    fn attach(&mut self, doc: &TreeNode, parent: NodeId) -> HubResult<NodeId> {
        let id = self.insert_document(doc, Some(parent));
        self.folder_children_mut(parent)?.push(id);
        self.mark_dirty();
        Ok(id)
    }

    fn insert_document(&mut self, doc: &TreeNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new();
        match doc {
            TreeNode::Folder { name, children } => {
                self.nodes.insert(
                    id,
                    Node {
                        name: name.clone(),
                        parent,
                        body: Body::Folder(Vec::new()),
                    },
                );
                let ids: Vec<NodeId> = children
                    .iter()
                    .map(|child| self.insert_document(child, Some(id)))
                    .collect();
                if let Some(Node {
                    body: Body::Folder(list),
                    ..
                }) = self.nodes.get_mut(&id)
                {
                    *list = ids;
                }
            }
            TreeNode::File { name, content } => {
                self.nodes.insert(
                    id,
                    Node {
                        name: name.clone(),
                        parent,
                        body: Body::File(content.clone()),
                    },
                );
            }
        }
        id
    }

    fn folder_children(&self, id: NodeId) -> HubResult<&Vec<NodeId>> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| HubError::NotFound(format!("node {id}")))?;
        match &node.body {
            Body::Folder(children) => Ok(children),
            Body::File(_) => Err(HubError::Validation(format!(
                "\"{}\" is a file, not a folder",
                node.name
            ))),
        }
    }

    fn folder_children_mut(&mut self, id: NodeId) -> HubResult<&mut Vec<NodeId>> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| HubError::NotFound(format!("node {id}")))?;
        match &mut node.body {
            Body::Folder(children) => Ok(children),
            Body::File(_) => Err(HubError::Validation(format!(
                "\"{}\" is a file, not a folder",
                node.name
            ))),
        }
    }
}

fn validate_name(name: &str) -> HubResult<()> {
    if name.is_empty() {
        return Err(HubError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (TreeStore, NodeId, NodeId, NodeId) {
        let mut store = TreeStore::new();
        let root = store.root();
        let a = store.create_folder(root, "A").unwrap();
        let b = store.create_folder(a, "B").unwrap();
        let c = store.create_folder(b, "C").unwrap();
        store.create_file(c, "notes.txt").unwrap();
        (store, a, b, c)
    }

    #[test]
    fn create_appends_in_order() {
        let mut store = TreeStore::new();
        let root = store.root();
        let first = store.create_folder(root, "first").unwrap();
        let second = store.create_file(root, "second.txt").unwrap();
        assert_eq!(store.children(root), &[first, second]);
        assert_eq!(store.content(second), Some(""));
        assert!(store.children(first).is_empty());
        assert!(store.is_dirty());
    }

    #[test]
    fn sibling_names_may_collide() {
        let mut store = TreeStore::new();
        let root = store.root();
        store.create_file(root, "dup").unwrap();
        store.create_file(root, "dup").unwrap();
        assert_eq!(store.children(root).len(), 2);
    }

    #[test]
    fn files_cannot_hold_children() {
        let mut store = TreeStore::new();
        let root = store.root();
        let file = store.create_file(root, "a.txt").unwrap();
        let err = store.create_folder(file, "nested").unwrap_err();
        assert!(matches!(err, HubError::Validation(_)));
        let err = store.edit_content(root, "text").unwrap_err();
        assert!(matches!(err, HubError::Validation(_)));
    }

    #[test]
    fn rename_rejects_empty_name() {
        let (mut store, a, _, _) = sample();
        assert!(matches!(store.rename(a, ""), Err(HubError::Validation(_))));
        assert_eq!(store.name(a), Some("A"));
        store.rename(a, "Renamed").unwrap();
        assert_eq!(store.name(a), Some("Renamed"));
    }

    #[test]
    fn moving_folder_below_itself_is_a_cycle() {
        let (mut store, a, _, _) = sample();
        let root = store.root();
        for target in store.descendant_ids(a) {
            let err = store.move_node(a, root, target).unwrap_err();
            assert!(matches!(err, HubError::Cycle(_)), "target {target}");
        }
        assert_eq!(store.parent_of(a), Some(root));
        assert_eq!(store.children(root), &[a]);
    }

    #[test]
    fn move_to_same_parent_appends() {
        let mut store = TreeStore::new();
        let root = store.root();
        let x = store.create_file(root, "x").unwrap();
        let y = store.create_file(root, "y").unwrap();
        store.move_node(x, root, root).unwrap();
        assert_eq!(store.children(root), &[y, x]);
    }

    #[test]
    fn move_requires_membership_in_source() {
        let (mut store, a, b, c) = sample();
        let err = store.move_node(c, a, a).unwrap_err();
        assert!(matches!(err, HubError::NotFound(_)));
        assert_eq!(store.parent_of(c), Some(b));
    }

    #[test]
    fn move_then_delete_scenario() {
        let mut store = TreeStore::new();
        let root = store.root();
        let a = store.create_folder(root, "A").unwrap();
        let b = store.create_folder(root, "B").unwrap();
        store.move_node(a, root, b).unwrap();
        store.delete_node(b, root).unwrap();
        assert!(store.children(root).is_empty());
        assert!(!store.contains(a));
        assert_eq!(store.len(), 1);

        let err = store.delete_node(b, root).unwrap_err();
        assert!(matches!(err, HubError::NotFound(_)));
    }

    #[test]
    fn copy_paste_is_structural_not_shared() {
        let (mut store, a, b, _) = sample();
        let root = store.root();
        store.move_node(b, a, root).unwrap();
        let clone = store.copy(b).unwrap();
        let pasted = store.paste(&clone, root).unwrap();

        assert_ne!(pasted, b);
        assert_eq!(store.subtree(b), store.subtree(pasted));
        let original_ids = store.descendant_ids(b);
        assert!(store
            .descendant_ids(pasted)
            .iter()
            .all(|id| !original_ids.contains(id)));

        store.rename(pasted, "B copy").unwrap();
        assert_eq!(store.name(b), Some("B"));
    }

    #[test]
    fn document_round_trip_preserves_order() {
        let (store, _, _, _) = sample();
        let doc = store.to_document();
        let reloaded = TreeStore::from_document(&doc).unwrap();
        assert_eq!(reloaded.to_document(), doc);
        assert!(!reloaded.is_dirty());

        let file = TreeNode::File {
            name: "x".into(),
            content: String::new(),
        };
        assert!(TreeStore::from_document(&file).is_err());
    }

    #[test]
    fn paths_address_nodes() {
        let (store, a, b, c) = sample();
        assert_eq!(store.resolve_path(&[]), Some(store.root()));
        assert_eq!(store.resolve_path(&[0, 0]), Some(b));
        assert_eq!(store.path_of(c), Some(vec![0, 0, 0]));
        assert_eq!(store.path_of(a), Some(vec![0]));
        assert_eq!(store.resolve_path(&[3]), None);
    }

    #[test]
    fn apply_copy_and_paste_through_clipboard() {
        let (mut store, a, _, _) = sample();
        let root = store.root();
        let mut clipboard = None;
        let err = store
            .apply(TreeCommand::Paste { parent: root }, &mut clipboard)
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidState(_)));

        store
            .apply(TreeCommand::Copy { node: a }, &mut clipboard)
            .unwrap();
        let outcome = store
            .apply(TreeCommand::Paste { parent: root }, &mut clipboard)
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Pasted(_)));
        assert_eq!(store.children(root).len(), 2);
    }

    #[test]
    fn json_shape_matches_wire_format() {
        let doc: TreeNode = serde_json::from_str(
            r#"{"name":"Root","type":"folder","children":[{"name":"a.txt","type":"file","content":"hi"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.children()[0].name(), "a.txt");
        let value = serde_json::to_value(TreeNode::empty_root()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "Root", "type": "folder", "children": []})
        );
    }
}
