//! Per-user onboarding sessions held between HTTP requests.
//!
//! Orchestrators are keyed by uid. Abandoning a session flips its liveness
//! flag, so a model reply still in flight cannot write to the profile.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::Turn;
use super::orchestrator::ConversationOrchestrator;
use crate::auth::SessionContext;
use crate::config::OnboardingConfig;
use crate::error::{DatabaseError, OnboardingError};
use crate::llm::LlmProvider;
use crate::store::{ProfilePatch, ProfileStore, UserProfile};

/// Store handle bound to one session. Writes become no-ops once the
/// session is abandoned.
struct SessionStore {
    inner: Arc<dyn ProfileStore>,
    alive: Arc<AtomicBool>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProfileStore for SessionStore {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, DatabaseError> {
        self.inner.get(uid).await
    }

    async fn save(&self, uid: &str, patch: ProfilePatch) -> Result<(), DatabaseError> {
        if !self.alive.load(Ordering::SeqCst) {
            debug!(uid = uid, "Dropping write from abandoned onboarding session");
            return Ok(());
        }
        self.inner.save(uid, patch).await
    }
}

/// A registered session.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub orchestrator: Arc<ConversationOrchestrator>,
    alive: Arc<AtomicBool>,
}

/// Holds the live onboarding conversation for each uid.
pub struct SessionRegistry {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn ProfileStore>,
    config: OnboardingConfig,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn ProfileStore>,
        config: OnboardingConfig,
    ) -> Self {
        Self {
            llm,
            store,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a conversation for the caller.
    ///
    /// A concluded session is replaced; one still in progress is an
    /// `InvalidState` error. A profile that already holds onboarding data
    /// cannot be onboarded again. Nothing is registered if `start()` fails.
    pub async fn start(
        &self,
        session: SessionContext,
    ) -> Result<(SessionHandle, Turn), OnboardingError> {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&session.uid) {
            let phase = existing.orchestrator.phase().await;
            if !phase.is_terminal() {
                return Err(OnboardingError::InvalidState {
                    phase,
                    action: "start a new conversation".into(),
                });
            }
        }

        let profile = self.store.get(&session.uid).await?;
        if profile.is_some_and(|p| p.onboarding_completed()) {
            info!(uid = %session.uid, "Onboarding start refused: already completed");
            return Err(OnboardingError::AlreadyCompleted { uid: session.uid });
        }

        let alive = Arc::new(AtomicBool::new(true));
        let store: Arc<dyn ProfileStore> = Arc::new(SessionStore {
            inner: self.store.clone(),
            alive: alive.clone(),
        });
        let uid = session.uid.clone();
        let orchestrator = Arc::new(ConversationOrchestrator::new(
            session,
            self.llm.clone(),
            store,
            self.config.clone(),
        ));
        let opening = orchestrator.start().await?;

        let handle = SessionHandle {
            id: Uuid::new_v4(),
            orchestrator,
            alive,
        };
        if let Some(previous) = sessions.insert(uid.clone(), handle.clone()) {
            previous.alive.store(false, Ordering::SeqCst);
        }
        info!(uid = %uid, session_id = %handle.id, "Onboarding session registered");
        Ok((handle, opening))
    }

    /// The caller's current session.
    pub async fn get(&self, uid: &str) -> Result<SessionHandle, OnboardingError> {
        self.sessions
            .read()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| OnboardingError::NoSession { uid: uid.into() })
    }

    /// Drop the caller's session. Its pending completion will not persist.
    pub async fn abandon(&self, uid: &str) -> Result<Uuid, OnboardingError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(uid)
            .ok_or_else(|| OnboardingError::NoSession { uid: uid.into() })?;
        handle.alive.store(false, Ordering::SeqCst);
        info!(uid = %uid, session_id = %handle.id, "Onboarding session abandoned");
        Ok(handle.id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
