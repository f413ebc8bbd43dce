//! One user's editing session: tree, clipboard, drag state and the gateway
//! that persists them.

use crate::drag::{DragSession, DropEffect, DropOutcome, DropTarget};
use crate::error::HubResult;
use crate::gateway::TreeGateway;
use crate::tree::{CommandOutcome, NodeId, TreeCommand, TreeNode, TreeStore};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Workspace {
    user_id: String,
    store: TreeStore,
    clipboard: Option<TreeNode>,
    drag: DragSession,
    gateway: Arc<dyn TreeGateway>,
}

impl Workspace {
    /// Load `user_id`'s tree through `gateway`.
    pub async fn open(gateway: Arc<dyn TreeGateway>, user_id: impl Into<String>) -> HubResult<Self> {
        let user_id = user_id.into();
        let doc = gateway.load(&user_id).await?;
        let store = TreeStore::from_document(&doc)?;
        info!(user_id = %user_id, nodes = store.len(), "workspace opened");
        Ok(Self {
            user_id,
            store,
            clipboard: None,
            drag: DragSession::new(),
            gateway,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn clipboard(&self) -> Option<&TreeNode> {
        self.clipboard.as_ref()
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    /// Apply one command. Mutations are followed by exactly one save; if the
    /// save fails the change stays in memory and the store stays dirty.
    pub async fn apply(&mut self, command: TreeCommand) -> HubResult<CommandOutcome> {
        let mutates = command.is_mutation();
        let outcome = self.store.apply(command, &mut self.clipboard)?;
        if mutates {
            self.save().await?;
        }
        Ok(outcome)
    }

    pub fn begin_drag(&mut self, node: NodeId) -> HubResult<()> {
        let origin = self.store.parent_of(node).unwrap_or_else(|| self.store.root());
        self.drag.start(&self.store, node, origin)
    }

    pub fn drag_over(&mut self, target: DropTarget) -> DropEffect {
        self.drag.hover(&self.store, target)
    }

    pub fn drag_leave(&mut self) {
        self.drag.leave();
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub async fn drop_on(&mut self, target: DropTarget) -> HubResult<DropOutcome> {
        let outcome = self.drag.drop_on(&mut self.store, target)?;
        if matches!(outcome, DropOutcome::Moved { .. }) {
            self.save().await?;
        }
        Ok(outcome)
    }

    /// Save again if a previous save failed.
    pub async fn sync(&mut self) -> HubResult<()> {
        if self.store.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    async fn save(&mut self) -> HubResult<()> {
        let doc = self.store.to_document();
        match self.gateway.save(&self.user_id, &doc).await {
            Ok(()) => {
                self.store.clear_dirty();
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "tree save failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubError;
    use crate::gateway::MemoryTreeGateway;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Counts saves and can be told to fail.
    #[derive(Default)]
    struct CountingGateway {
        inner: MemoryTreeGateway,
        saves: Mutex<usize>,
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl TreeGateway for CountingGateway {
        async fn load(&self, user_id: &str) -> HubResult<TreeNode> {
            self.inner.load(user_id).await
        }

        async fn save(&self, user_id: &str, tree: &TreeNode) -> HubResult<()> {
            if *self.fail.lock() {
                return Err(HubError::Unavailable("offline".into()));
            }
            *self.saves.lock() += 1;
            self.inner.save(user_id, tree).await
        }

        async fn exists(&self, user_id: &str) -> HubResult<bool> {
            self.inner.exists(user_id).await
        }
    }

    #[tokio::test]
    async fn each_mutation_saves_once() {
        let gateway = Arc::new(CountingGateway::default());
        let mut ws = Workspace::open(gateway.clone(), "u1").await.unwrap();
        let root = ws.store().root();
        let outcome = ws
            .apply(TreeCommand::CreateFolder {
                parent: root,
                name: "A".into(),
            })
            .await
            .unwrap();
        let a = outcome.created_node().unwrap();
        ws.apply(TreeCommand::Copy { node: a }).await.unwrap();
        assert_eq!(*gateway.saves.lock(), 1);
        ws.apply(TreeCommand::Paste { parent: a }).await.unwrap();
        assert_eq!(*gateway.saves.lock(), 2);

        let reopened = Workspace::open(gateway.clone(), "u1").await.unwrap();
        assert_eq!(reopened.store().to_document(), ws.store().to_document());
    }

    #[tokio::test]
    async fn failed_save_keeps_change_and_retries() {
        let gateway = Arc::new(CountingGateway::default());
        let mut ws = Workspace::open(gateway.clone(), "u1").await.unwrap();
        let root = ws.store().root();
        *gateway.fail.lock() = true;
        let err = ws
            .apply(TreeCommand::CreateFile {
                parent: root,
                name: "draft.txt".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Unavailable(_)));
        assert_eq!(ws.store().children(root).len(), 1);
        assert!(ws.store().is_dirty());

        *gateway.fail.lock() = false;
        ws.sync().await.unwrap();
        assert!(!ws.store().is_dirty());
        assert_eq!(*gateway.saves.lock(), 1);
    }

    #[tokio::test]
    async fn drop_saves_only_on_move() {
        let gateway = Arc::new(CountingGateway::default());
        let mut ws = Workspace::open(gateway.clone(), "u1").await.unwrap();
        let root = ws.store().root();
        let a = ws
            .apply(TreeCommand::CreateFolder {
                parent: root,
                name: "A".into(),
            })
            .await
            .unwrap()
            .created_node()
            .unwrap();
        let f = ws
            .apply(TreeCommand::CreateFile {
                parent: root,
                name: "f".into(),
            })
            .await
            .unwrap()
            .created_node()
            .unwrap();
        assert_eq!(*gateway.saves.lock(), 2);

        ws.begin_drag(a).unwrap();
        ws.drag_over(DropTarget::Node(f));
        assert!(matches!(
            ws.drop_on(DropTarget::Node(f)).await.unwrap(),
            DropOutcome::Rejected(_)
        ));
        assert_eq!(*gateway.saves.lock(), 2);

        ws.begin_drag(f).unwrap();
        assert_eq!(ws.drag_over(DropTarget::Node(a)), DropEffect::Move);
        ws.drop_on(DropTarget::Node(a)).await.unwrap();
        assert_eq!(*gateway.saves.lock(), 3);
        assert_eq!(ws.store().parent_of(f), Some(a));
    }
}
