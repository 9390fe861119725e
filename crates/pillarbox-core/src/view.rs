//! Rendering surfaces bound to players.
//!
//! A shared view attaches to the engine of a session created through
//! `initialize` and has no channel of its own. A standalone view owns a
//! dedicated engine and exposes play / pause on `<view_namespace>/<view_id>`.

use std::collections::HashMap;
use std::sync::Arc;

use pillarbox_models::channel::{ChannelName, ViewSource};
use pillarbox_models::media::MediaReference;
use pillarbox_models::{SessionId, ViewId};
use tokio::sync::Mutex;

use crate::command::SessionCommand;
use crate::engine::EngineFactory;
use crate::error::CoreError;
use crate::events::EventBus;
use crate::registry::SessionRegistry;
use crate::session::{PlaybackSession, SessionHandle, SessionProfile};

/// Host-provided surface a player renders into.
pub trait RenderSurface: Send {
    fn attach(&mut self, player: &SessionHandle);
    fn detach(&mut self);
}

pub trait SurfaceFactory: Send + Sync {
    fn create(&self, view_id: ViewId) -> Box<dyn RenderSurface>;
}

/// Surfaces for a bridge running without a display.
pub struct HeadlessSurfaceFactory;

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(&self, view_id: ViewId) -> Box<dyn RenderSurface> {
        Box::new(HeadlessSurface {
            view_id,
            player: None,
        })
    }
}

struct HeadlessSurface {
    view_id: ViewId,
    player: Option<SessionHandle>,
}

impl RenderSurface for HeadlessSurface {
    fn attach(&mut self, player: &SessionHandle) {
        tracing::debug!(view_id = self.view_id, media = %player.media(), "surface attached");
        self.player = Some(player.clone());
    }

    fn detach(&mut self) {
        if self.player.take().is_some() {
            tracing::debug!(view_id = self.view_id, "surface detached");
        }
    }
}

enum AttachedView {
    Shared {
        surface: Box<dyn RenderSurface>,
        session: SessionId,
    },
    Standalone {
        surface: Box<dyn RenderSurface>,
        session: PlaybackSession,
    },
}

pub struct ViewBinder {
    views: Mutex<HashMap<ViewId, AttachedView>>,
    surfaces: Arc<dyn SurfaceFactory>,
    engines: Arc<dyn EngineFactory>,
    bus: EventBus,
}

impl ViewBinder {
    pub fn new(surfaces: Arc<dyn SurfaceFactory>, engines: Arc<dyn EngineFactory>, bus: EventBus) -> Self {
        Self {
            views: Mutex::new(HashMap::new()),
            surfaces,
            engines,
            bus,
        }
    }

    /// Creates view `view_id` and returns the generation of its channel. A
    /// shared view never creates a session: the identifier must already be
    /// live in `registry`.
    pub async fn create(
        &self,
        registry: &SessionRegistry,
        view_id: ViewId,
        source: ViewSource,
    ) -> Result<u64, CoreError> {
        let mut views = self.views.lock().await;
        if views.contains_key(&view_id) {
            return Err(CoreError::DuplicateView(view_id));
        }

        let mut surface = self.surfaces.create(view_id);
        let view = match source {
            ViewSource::Shared { identifier } => {
                let player = registry
                    .lookup(identifier)
                    .await
                    .ok_or(CoreError::SessionNotFound(identifier))?;
                surface.attach(&player);
                tracing::info!(view_id, session_id = identifier, "view attached to session");
                AttachedView::Shared {
                    surface,
                    session: identifier,
                }
            }
            ViewSource::Standalone { uri } => {
                let media = MediaReference::parse(&uri);
                let media_kind = media.kind();
                let session = PlaybackSession::open(
                    ChannelName::View(view_id),
                    media,
                    SessionProfile::StandaloneView,
                    self.engines.create(),
                    self.bus.clone(),
                );
                surface.attach(&session.handle());
                tracing::info!(view_id, media_kind = media_kind.as_str(), "standalone view created");
                AttachedView::Standalone { surface, session }
            }
        };

        let generation = match &view {
            AttachedView::Shared { .. } => self.bus.next_generation(),
            AttachedView::Standalone { session, .. } => session.generation(),
        };
        views.insert(view_id, view);
        Ok(generation)
    }

    /// Detaches and drops `view_id`. Returns whether it existed.
    pub async fn dispose(&self, view_id: ViewId) -> bool {
        let Some(view) = self.views.lock().await.remove(&view_id) else {
            return false;
        };
        match view {
            AttachedView::Shared { mut surface, .. } => surface.detach(),
            AttachedView::Standalone {
                mut surface,
                session,
            } => {
                surface.detach();
                session.close().await;
            }
        }
        tracing::info!(view_id, "view disposed");
        true
    }

    pub async fn dispose_all(&self) -> usize {
        let ids: Vec<ViewId> = self.views.lock().await.keys().copied().collect();
        let mut count = 0;
        for id in ids {
            if self.dispose(id).await {
                count += 1;
            }
        }
        count
    }

    /// Runs a command on a standalone view. Shared views have no channel.
    pub async fn execute(&self, view_id: ViewId, command: SessionCommand) -> Result<(), CoreError> {
        let views = self.views.lock().await;
        match views.get(&view_id) {
            Some(AttachedView::Standalone { session, .. }) => {
                session.execute(command).await;
                Ok(())
            }
            _ => Err(CoreError::ViewNotFound(view_id)),
        }
    }

    /// Session a shared view is attached to.
    pub async fn shared_session(&self, view_id: ViewId) -> Option<SessionId> {
        match self.views.lock().await.get(&view_id) {
            Some(AttachedView::Shared { session, .. }) => Some(*session),
            _ => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.views.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SimulatedEngineFactory, SimulatedMedia};
    use crate::registry::DuplicatePolicy;

    fn setup() -> (SessionRegistry, ViewBinder) {
        let engines: Arc<dyn EngineFactory> = Arc::new(SimulatedEngineFactory::new(SimulatedMedia::default()));
        let bus = EventBus::default();
        let registry = SessionRegistry::new(engines.clone(), bus.clone(), DuplicatePolicy::Reject);
        let views = ViewBinder::new(Arc::new(HeadlessSurfaceFactory), engines, bus);
        (registry, views)
    }

    #[tokio::test(start_paused = true)]
    async fn shared_view_requires_live_session() {
        let (registry, views) = setup();
        let err = views
            .create(&registry, 1, ViewSource::Shared { identifier: 9 })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound(9)));
        assert_eq!(views.len().await, 0);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_view_does_not_own_the_session() {
        let (registry, views) = setup();
        registry.create(4, "https://example/video.mp4").await.unwrap();
        views
            .create(&registry, 1, ViewSource::Shared { identifier: 4 })
            .await
            .unwrap();
        assert_eq!(views.shared_session(1).await, Some(4));

        // Shared views expose no commands of their own.
        let err = views.execute(1, SessionCommand::Play).await.unwrap_err();
        assert!(matches!(err, CoreError::ViewNotFound(1)));

        assert!(views.dispose(1).await);
        assert!(registry.contains(4).await);
        registry.dispose_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn standalone_view_lifecycle() {
        let (registry, views) = setup();
        views
            .create(
                &registry,
                2,
                ViewSource::Standalone {
                    uri: "urn:rts:video:123".into(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            views
                .create(&registry, 2, ViewSource::Standalone { uri: "https://example/a.mp4".into() })
                .await,
            Err(CoreError::DuplicateView(2))
        ));

        views.execute(2, SessionCommand::Play).await.unwrap();
        assert_eq!(registry.len().await, 0);

        assert!(views.dispose(2).await);
        assert!(!views.dispose(2).await);
        assert!(views.execute(2, SessionCommand::Pause).await.is_err());
    }
}
