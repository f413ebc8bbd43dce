//! Error taxonomy shared by every core operation.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("move would create a cycle: {0}")]
    Cycle(String),
    #[error("duplicate invite: {0}")]
    DuplicateInvite(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl HubError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::Validation(_) => "validation",
            HubError::NotFound(_) => "not_found",
            HubError::UserNotFound(_) => "user_not_found",
            HubError::Forbidden(_) => "forbidden",
            HubError::InvalidState(_) => "invalid_state",
            HubError::Cycle(_) => "cycle",
            HubError::DuplicateInvite(_) => "duplicate_invite",
            HubError::Conflict(_) => "conflict",
            HubError::Unavailable(_) => "unavailable",
        }
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        HubError::Unavailable(err.to_string())
    }
}

pub type HubResult<T> = std::result::Result<T, HubError>;
