use std::collections::HashMap;
use std::sync::Arc;

use pillarbox_models::channel::ChannelName;
use pillarbox_models::media::MediaReference;
use pillarbox_models::playback::PlaybackStateSnapshot;
use pillarbox_models::SessionId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::command::SessionCommand;
use crate::engine::EngineFactory;
use crate::error::CoreError;
use crate::events::EventBus;
use crate::session::{PlaybackSession, SessionHandle, SessionProfile};

/// What `initialize` does with an identifier that is already live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateSession`.
    #[default]
    Reject,
    /// Dispose the live session, then create the new one.
    Replace,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "replace" => Ok(DuplicatePolicy::Replace),
            other => Err(format!("unknown duplicate policy '{other}'")),
        }
    }
}

/// A session just opened by `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCreated {
    /// Live-session count including the new one.
    pub live: usize,
    pub generation: u64,
}

/// Live controller sessions keyed by caller-assigned identifier.
///
/// Every mutation goes through one async mutex, so engine calls and map
/// updates are serialized the way a single UI thread would serialize them.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, PlaybackSession>>,
    engines: Arc<dyn EngineFactory>,
    bus: EventBus,
    duplicate_policy: DuplicatePolicy,
}

impl SessionRegistry {
    pub fn new(engines: Arc<dyn EngineFactory>, bus: EventBus, duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            engines,
            bus,
            duplicate_policy,
        }
    }

    /// Creates a session for `data_source`. The engine decides whether the
    /// source is playable; an unplayable one reports `unknown` state.
    pub async fn create(&self, id: SessionId, data_source: &str) -> Result<SessionCreated, CoreError> {
        let media = MediaReference::parse(data_source);
        let mut sessions = self.sessions.lock().await;

        if sessions.contains_key(&id) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => return Err(CoreError::DuplicateSession(id)),
                DuplicatePolicy::Replace => {
                    if let Some(previous) = sessions.remove(&id) {
                        previous.close().await;
                    }
                    tracing::info!(session_id = id, "replacing live session");
                }
            }
        }

        let media_kind = media.kind();
        let session = PlaybackSession::open(
            ChannelName::Session(id),
            media,
            SessionProfile::Controller,
            self.engines.create(),
            self.bus.clone(),
        );
        let generation = session.generation();
        sessions.insert(id, session);
        let live = sessions.len();

        tracing::info!(
            session_id = id,
            media_kind = media_kind.as_str(),
            live_sessions = live,
            "session initialized"
        );
        Ok(SessionCreated { live, generation })
    }

    /// Tears down `id` if it is live. Returns the live-session count either way.
    pub async fn dispose(&self, id: SessionId) -> usize {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.remove(&id) else {
            tracing::debug!(session_id = id, "dispose of unknown session ignored");
            return sessions.len();
        };
        session.close().await;

        let live = sessions.len();
        tracing::info!(session_id = id, live_sessions = live, "session disposed");
        live
    }

    /// Disposes every live session. Returns how many were torn down.
    pub async fn dispose_all(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let drained: Vec<_> = sessions.drain().collect();
        let count = drained.len();
        for (_, session) in drained {
            session.close().await;
        }
        if count > 0 {
            tracing::info!(disposed = count, "all sessions disposed");
        }
        count
    }

    pub async fn execute(&self, id: SessionId, command: SessionCommand) -> Result<(), CoreError> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(&id).ok_or(CoreError::SessionNotFound(id))?;
        session.execute(command).await;
        Ok(())
    }

    /// Non-owning view of a live session, for rendering surfaces.
    pub async fn lookup(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&id).map(PlaybackSession::handle)
    }

    pub async fn snapshot(&self, id: SessionId) -> Option<PlaybackStateSnapshot> {
        let sessions = self.sessions.lock().await;
        match sessions.get(&id) {
            Some(session) => Some(session.snapshot().await),
            None => None,
        }
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
