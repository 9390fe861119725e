use std::sync::{Arc, Weak};

use pillarbox_models::channel::ChannelName;
use pillarbox_models::media::MediaReference;
use pillarbox_models::playback::PlaybackStateSnapshot;
use tokio::sync::{mpsc, Mutex};

use crate::command::SessionCommand;
use crate::emitter::EventEmitter;
use crate::engine::{EngineState, MediaEngine, SharedEngine};
use crate::events::EventBus;
use crate::sampler::{PositionSampler, POSITION_INTERVAL};

/// How much telemetry a session pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProfile {
    /// Created through `initialize`: full telemetry and position sampling.
    Controller,
    /// Owned by a standalone rendering surface: state and is-playing only.
    StandaloneView,
}

impl SessionProfile {
    pub fn samples_position(self) -> bool {
        self == SessionProfile::Controller
    }

    pub fn reports_duration(self) -> bool {
        self == SessionProfile::Controller
    }

    pub fn reports_video_size(self) -> bool {
        self == SessionProfile::Controller
    }
}

/// One live player: an engine, the task forwarding its events and, for
/// controllers, the position sampler.
pub struct PlaybackSession {
    channel: ChannelName,
    generation: u64,
    media: MediaReference,
    engine: SharedEngine,
    sampler: Option<PositionSampler>,
    emitter: EventEmitter,
}

impl PlaybackSession {
    /// Loads `media` into `engine`, prepares it and starts forwarding its events.
    pub fn open(
        channel: ChannelName,
        media: MediaReference,
        profile: SessionProfile,
        mut engine: Box<dyn MediaEngine>,
        bus: EventBus,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        engine.set_listener(events_tx.clone());
        engine.set_media(&media);
        engine.prepare();

        let generation = bus.next_generation();
        let engine: SharedEngine = Arc::new(Mutex::new(engine));
        let emitter = EventEmitter::spawn(channel, generation, profile, engine.clone(), events_rx, bus);
        let sampler = profile
            .samples_position()
            .then(|| PositionSampler::spawn(engine.clone(), events_tx, POSITION_INTERVAL));

        Self {
            channel,
            generation,
            media,
            engine,
            sampler,
            emitter,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.as_ref().is_some_and(PositionSampler::is_running)
    }

    pub async fn execute(&self, command: SessionCommand) {
        let mut engine = self.engine.lock().await;
        match command {
            SessionCommand::Play => {
                if engine.playback_state() == EngineState::Ended {
                    engine.seek_to(0);
                }
                engine.play();
            }
            SessionCommand::Pause => engine.pause(),
        }
    }

    pub async fn snapshot(&self) -> PlaybackStateSnapshot {
        let engine = self.engine.lock().await;
        snapshot_of(&**engine)
    }

    /// Non-owning reference for collaborators such as rendering surfaces.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            channel: self.channel,
            media: self.media.clone(),
            engine: Arc::downgrade(&self.engine),
        }
    }

    /// Tears the session down: pause, stop sampling, unsubscribe, release.
    ///
    /// Nothing is pushed for this session once this returns.
    pub async fn close(mut self) {
        self.engine.lock().await.pause();
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.stop().await;
        }
        self.engine.lock().await.clear_listener();
        self.emitter.stop().await;
        self.engine.lock().await.release();
        tracing::debug!(channel = ?self.channel, "engine released");
    }
}

fn snapshot_of(engine: &dyn MediaEngine) -> PlaybackStateSnapshot {
    let size = engine.video_size().unwrap_or_default();
    PlaybackStateSnapshot {
        state: engine.playback_state().label(),
        is_playing: engine.is_playing(),
        position_millis: engine.current_position(),
        duration_millis: engine.duration(),
        video_width: size.width,
        video_height: size.height,
    }
}

/// A session seen from outside the registry. Does not keep the engine alive.
#[derive(Clone)]
pub struct SessionHandle {
    channel: ChannelName,
    media: MediaReference,
    engine: Weak<Mutex<Box<dyn MediaEngine>>>,
}

impl SessionHandle {
    pub fn media(&self) -> &MediaReference {
        &self.media
    }

    pub fn is_alive(&self) -> bool {
        self.engine.strong_count() > 0
    }

    /// Current engine state, or `None` once the session is gone.
    pub async fn snapshot(&self) -> Option<PlaybackStateSnapshot> {
        let shared = self.engine.upgrade()?;
        let engine = shared.lock().await;
        Some(snapshot_of(&**engine))
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("channel", &self.channel)
            .field("media", &self.media)
            .field("alive", &self.is_alive())
            .finish()
    }
}
