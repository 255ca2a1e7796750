use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{StoreError, UserRecord, UserStore};

/// Entry in a JSON seed file. `id` is generated when omitted.
#[derive(Debug, Deserialize)]
struct SeedUser {
    id: Option<Uuid>,
    username: String,
    password_hash: String,
    role: String,
}

/// Process-local user store, seeded from a JSON file at startup.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Parse a seed document: a JSON array of
    /// `{ "id"?, "username", "password_hash", "role" }`.
    pub fn from_seed_json(content: &str) -> Result<Self, StoreError> {
        let seeds: Vec<SeedUser> =
            serde_json::from_str(content).map_err(|e| StoreError::Seed(e.to_string()))?;

        let mut users = HashMap::with_capacity(seeds.len());
        let mut names = std::collections::HashSet::new();
        for seed in seeds {
            if seed.username.trim().is_empty() {
                return Err(StoreError::Seed("username must not be empty".to_string()));
            }
            if !names.insert(seed.username.clone()) {
                return Err(StoreError::Seed(format!("duplicate username '{}'", seed.username)));
            }
            let record = UserRecord {
                id: seed.id.unwrap_or_else(Uuid::new_v4),
                username: seed.username,
                password_hash: seed.password_hash,
                role: seed.role,
            };
            users.insert(record.id, record);
        }

        Ok(Self {
            users: RwLock::new(users),
        })
    }

    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_seed_json(&content)?;
        info!("Loaded user seed file {}", path.display());
        Ok(store)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn upsert(&self, user: UserRecord) -> Result<(), StoreError> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
