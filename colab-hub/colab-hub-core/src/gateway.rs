//! Whole-tree persistence keyed by user id.
//!
//! A save always overwrites what was stored before; there is no version token,
//! so two sessions writing the same user's tree race and the last one wins.

use crate::error::{HubError, HubResult};
use crate::tree::{NodeKind, TreeNode};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

#[async_trait]
pub trait TreeGateway: Send + Sync {
    /// Previously saved tree, or a fresh empty root.
    async fn load(&self, user_id: &str) -> HubResult<TreeNode>;

    /// Replace the stored tree for `user_id`.
    async fn save(&self, user_id: &str, tree: &TreeNode) -> HubResult<()>;

    /// Whether a tree has ever been saved for `user_id`.
    async fn exists(&self, user_id: &str) -> HubResult<bool>;
}

fn check_root(tree: &TreeNode) -> HubResult<()> {
    if tree.kind() != NodeKind::Folder {
        return Err(HubError::Validation(
            "tree root must be a folder".to_string(),
        ));
    }
    Ok(())
}

/// Stores each tree as `<dir>/<user>.json`.
pub struct FsTreeGateway {
    dir: PathBuf,
}

impl FsTreeGateway {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory where trees are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, user_id: &str) -> HubResult<PathBuf> {
        if user_id.is_empty()
            || user_id.starts_with('.')
            || user_id.contains(['/', '\\'])
            || user_id.contains('\0')
        {
            return Err(HubError::Validation(format!(
                "invalid user id {user_id:?}"
            )));
        }
        Ok(self.dir.join(format!("{user_id}.json")))
    }
}

#[async_trait]
impl TreeGateway for FsTreeGateway {
    async fn load(&self, user_id: &str) -> HubResult<TreeNode> {
        let path = self.path(user_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(user_id, "no stored tree, using empty root");
                return Ok(TreeNode::empty_root());
            }
            Err(e) => return Err(HubError::unavailable(e)),
        };
        let tree: TreeNode = serde_json::from_slice(&bytes).map_err(HubError::unavailable)?;
        check_root(&tree)?;
        Ok(tree)
    }

    async fn save(&self, user_id: &str, tree: &TreeNode) -> HubResult<()> {
        check_root(tree)?;
        let path = self.path(user_id)?;
        let data = serde_json::to_vec_pretty(tree).map_err(HubError::unavailable)?;
        // each write gets its own temp file so overlapping saves never share one
        let tmp = self.dir.join(format!(".{user_id}.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(HubError::unavailable)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(HubError::unavailable(e));
        }
        info!(user_id, "tree saved");
        Ok(())
    }

    async fn exists(&self, user_id: &str) -> HubResult<bool> {
        let path = self.path(user_id)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(HubError::unavailable)
    }
}

/// Process-local gateway for tests and throwaway servers.
#[derive(Default)]
pub struct MemoryTreeGateway {
    trees: RwLock<HashMap<String, TreeNode>>,
}

impl MemoryTreeGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TreeGateway for MemoryTreeGateway {
    async fn load(&self, user_id: &str) -> HubResult<TreeNode> {
        Ok(self
            .trees
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_else(TreeNode::empty_root))
    }

    async fn save(&self, user_id: &str, tree: &TreeNode) -> HubResult<()> {
        check_root(tree)?;
        self.trees.write().insert(user_id.to_string(), tree.clone());
        Ok(())
    }

    async fn exists(&self, user_id: &str) -> HubResult<bool> {
        Ok(self.trees.read().contains_key(user_id))
    }
}
