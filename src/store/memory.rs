//! In-memory `ProfileStore` for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{ProfilePatch, ProfileStore, UserProfile};
use crate::error::DatabaseError;

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile, replacing any existing document.
    pub async fn insert(&self, uid: impl Into<String>, profile: UserProfile) {
        self.profiles.write().await.insert(uid.into(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, DatabaseError> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn save(&self, uid: &str, patch: ProfilePatch) -> Result<(), DatabaseError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.entry(uid.to_string()).or_default();
        patch.apply_to(profile);
        debug!(uid = uid, "Profile saved (memory)");
        Ok(())
    }
}
