pub mod api;
pub mod config;

use anyhow::Result;
use colab_hub_core::collaboration::CollaborationEngine;
use colab_hub_core::directory::{InMemoryDirectory, UserDirectory};
use colab_hub_core::gateway::{FsTreeGateway, MemoryTreeGateway, TreeGateway};
use std::sync::Arc;
use tracing::{info, warn};

/// Wire the gateway, user directory and collaboration engine described by `config`.
pub fn build_state(config: &config::ServerConfig) -> Result<api::AppState> {
    let trees: Arc<dyn TreeGateway> = if config.in_memory {
        info!("file trees kept in memory");
        Arc::new(MemoryTreeGateway::new())
    } else {
        info!(dir = %config.data_dir.display(), "file trees stored on disk");
        Arc::new(FsTreeGateway::new(&config.data_dir)?)
    };

    let directory = match &config.users_file {
        Some(path) => {
            let dir = InMemoryDirectory::from_json_file(path)?;
            info!(path = %path.display(), users = dir.len(), "user directory loaded");
            dir
        }
        None => {
            warn!("no users file configured; invitations will fail until users exist");
            InMemoryDirectory::new()
        }
    };
    let directory: Arc<dyn UserDirectory> = Arc::new(directory);

    let collab = match &config.state_file {
        Some(path) => CollaborationEngine::with_state_file(directory, path)?,
        None => CollaborationEngine::new(directory),
    };
    Ok(api::AppState::new(trees, Arc::new(collab)))
}
