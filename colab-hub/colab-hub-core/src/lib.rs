pub mod collaboration;
pub mod directory;
pub mod drag;
pub mod error;
pub mod events;
pub mod gateway;
pub mod notifications;
pub mod tree;
pub mod workspace;

pub use error::{HubError, HubResult};
