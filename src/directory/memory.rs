//! In-memory user directory.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::config::UserEntryConfig;
use crate::directory::{DirectoryError, ResolvedUser, UserDirectory};

/// Thread-safe directory keyed by lowercased identity, so lookups match
/// case-insensitively like the relational backend.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<DashMap<String, ResolvedUser>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory seeded from configuration.
    pub fn from_entries(entries: &[UserEntryConfig]) -> Self {
        let directory = Self::new();
        for entry in entries {
            directory.insert(ResolvedUser {
                dn: entry.dn.trim().to_string(),
                given_name: entry.given_name.clone(),
                surname: entry.surname.clone(),
                roles: entry.roles.clone(),
            });
        }
        tracing::info!(users = directory.len(), "In-memory directory seeded");
        directory
    }

    /// Add or replace a user.
    pub fn insert(&self, user: ResolvedUser) {
        self.users.insert(user.dn.to_lowercase(), user);
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError> {
        if identity.trim().is_empty() {
            return Err(DirectoryError::UserNotFound(identity.to_string()));
        }

        match self.users.get(&identity.trim().to_lowercase()) {
            Some(user) => {
                tracing::debug!(dn = %identity, "Found user in memory directory");
                Ok(user.value().clone())
            }
            None => {
                tracing::debug!(dn = %identity, "User not found in memory directory");
                Err(DirectoryError::UserNotFound(identity.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
