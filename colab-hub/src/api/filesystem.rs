use super::{ApiJson, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use colab_hub_core::events::HubEvent;
use colab_hub_core::tree::{NodeId, TreeCommand, TreeNode, TreeStore};
use colab_hub_core::workspace::Workspace;
use colab_hub_core::HubError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Tree command addressed by child-index paths from the root, since node ids
/// only live as long as one loaded tree.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PathCommand {
    CreateFile { parent: Vec<usize>, name: String },
    CreateFolder { parent: Vec<usize>, name: String },
    Rename { node: Vec<usize>, name: String },
    EditContent { node: Vec<usize>, content: String },
    Delete { node: Vec<usize> },
    Move { node: Vec<usize>, to: Vec<usize> },
    /// Copy `node` and paste the copy into `into`.
    Duplicate { node: Vec<usize>, into: Vec<usize> },
}

fn resolve(store: &TreeStore, path: &[usize]) -> Result<NodeId, HubError> {
    store
        .resolve_path(path)
        .ok_or_else(|| HubError::NotFound(format!("no node at path {path:?}")))
}

fn parent_path(path: &[usize]) -> Result<&[usize], HubError> {
    match path.split_last() {
        Some((_, parent)) => Ok(parent),
        None => Err(HubError::Validation(
            "the root folder cannot be deleted or moved".to_string(),
        )),
    }
}

/// Translate into id-addressed commands against `store`.
fn to_tree_commands(store: &TreeStore, command: PathCommand) -> Result<Vec<TreeCommand>, HubError> {
    Ok(match command {
        PathCommand::CreateFile { parent, name } => vec![TreeCommand::CreateFile {
            parent: resolve(store, &parent)?,
            name,
        }],
        PathCommand::CreateFolder { parent, name } => vec![TreeCommand::CreateFolder {
            parent: resolve(store, &parent)?,
            name,
        }],
        PathCommand::Rename { node, name } => vec![TreeCommand::Rename {
            node: resolve(store, &node)?,
            name,
        }],
        PathCommand::EditContent { node, content } => vec![TreeCommand::EditContent {
            node: resolve(store, &node)?,
            content,
        }],
        PathCommand::Delete { node } => vec![TreeCommand::Delete {
            parent: resolve(store, parent_path(&node)?)?,
            node: resolve(store, &node)?,
        }],
        PathCommand::Move { node, to } => vec![TreeCommand::Move {
            from: resolve(store, parent_path(&node)?)?,
            node: resolve(store, &node)?,
            to: resolve(store, &to)?,
        }],
        PathCommand::Duplicate { node, into } => {
            let node = resolve(store, &node)?;
            let into = resolve(store, &into)?;
            vec![
                TreeCommand::Copy { node },
                TreeCommand::Paste { parent: into },
            ]
        }
    })
}

pub(super) async fn load_tree(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<TreeNode>> {
    let tree = state.trees.load(&user_id).await?;
    if !state.trees.exists(&user_id).await? {
        state.trees.save(&user_id, &tree).await?;
        info!(user_id = %user_id, "created default file system");
    }
    Ok(Json(tree))
}

pub(super) async fn save_tree(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(tree): ApiJson<TreeNode>,
) -> ApiResult<Json<Value>> {
    state.trees.save(&user_id, &tree).await?;
    state.events.send(HubEvent::TreeSaved {
        user_id: user_id.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "message": "File system saved successfully",
        "fileSystem": tree,
    })))
}

pub(super) async fn apply_command(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(command): ApiJson<PathCommand>,
) -> ApiResult<Json<Value>> {
    let mut workspace = Workspace::open(state.trees.clone(), user_id.clone()).await?;
    let commands = to_tree_commands(workspace.store(), command)?;
    let mut created = None;
    for command in commands {
        let outcome = workspace.apply(command).await?;
        created = outcome.created_node().or(created);
    }
    state.events.send(HubEvent::TreeSaved {
        user_id: user_id.clone(),
    });
    let store = workspace.store();
    Ok(Json(json!({
        "success": true,
        "path": created.and_then(|id| store.path_of(id)),
        "fileSystem": store.to_document(),
    })))
}
