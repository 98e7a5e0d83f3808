use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::claims::ClaimDialogue;
use crate::error::Result;
use crate::history::ContextWindow;
use crate::profile::UserProfile;

/// Everything the orchestrator mutates for one conversation: the bounded
/// history, the claim dialogue and the member profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub window: ContextWindow,
    pub claim: ClaimDialogue,
    pub profile: UserProfile,
}

impl SessionState {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            window: ContextWindow::new(),
            claim: ClaimDialogue::default(),
            profile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
}

impl Session {
    pub fn new(id: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            id: id.into(),
            state: SessionState::new(profile),
        }
    }
}

/// Store mapping session id to session state.
///
/// Handlers do read-modify-write per request: concurrent requests against the
/// same session id can lose updates. Callers needing stronger guarantees must
/// serialize per-session access themselves.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_get_delete_roundtrip() {
        let storage = InMemorySessionStorage::new();
        let session = Session::new("s1", UserProfile::sample());
        storage.save(session).await.unwrap();

        let loaded = storage.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "s1");
        assert!(!loaded.state.claim.is_active());

        storage.delete("s1").await.unwrap();
        assert!(storage.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_session_is_none_not_error() {
        let storage = InMemorySessionStorage::new();
        assert!(storage.get("nope").await.unwrap().is_none());
    }
}
