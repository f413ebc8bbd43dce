//! Lookup of user display data. Account management lives elsewhere; the core
//! only needs to resolve ids to names.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserProfile {
    /// Full name, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ if !self.username.is_empty() => &self.username,
            _ => "User",
        }
    }

    /// Up to two uppercase initials of the display name.
    pub fn initials(&self) -> String {
        let initials: String = self
            .display_name()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &str) -> Option<UserProfile>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let dir = Self::new();
        for user in users {
            dir.insert(user);
        }
        dir
    }

    /// Seed from a JSON array of profiles.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let users: Vec<UserProfile> = serde_json::from_str(&data)?;
        Ok(Self::with_users(users))
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.write().insert(user.id.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user(&self, id: &str) -> Option<UserProfile> {
        self.users.read().get(id).cloned()
    }
}
