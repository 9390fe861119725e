//! The media engine seen from the bridge: an opaque player that can be
//! prepared, played, paused and seeked, and that reports its transitions
//! through a single listener.

pub mod simulated;

use std::sync::Arc;

use pillarbox_models::media::MediaReference;
use pillarbox_models::playback::{PlaybackStateLabel, VideoSize};
use tokio::sync::{mpsc, Mutex};

pub use simulated::{SimulatedEngine, SimulatedEngineFactory, SimulatedMedia};

/// Engine playback state machine: idle -> buffering -> ready -> ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Buffering,
    Ready,
    Ended,
    /// The engine gave up on the current media.
    Error,
}

impl EngineState {
    pub fn label(self) -> PlaybackStateLabel {
        match self {
            EngineState::Idle => PlaybackStateLabel::Idle,
            EngineState::Buffering => PlaybackStateLabel::Buffering,
            EngineState::Ready => PlaybackStateLabel::Ready,
            EngineState::Ended => PlaybackStateLabel::Ended,
            _ => PlaybackStateLabel::Unknown,
        }
    }
}

/// Everything that can happen to a session, engine transitions and sampler
/// ticks alike. Consumed by one handler per session, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged(EngineState),
    VideoSizeChanged(VideoSize),
    IsPlayingChanged(bool),
    PositionTick(u64),
}

pub type EngineListener = mpsc::UnboundedSender<EngineEvent>;

/// Engine handle shared between a session, its sampler and its emitter.
/// All engine calls are serialized through the mutex.
pub type SharedEngine = Arc<Mutex<Box<dyn MediaEngine>>>;

pub trait MediaEngine: Send {
    fn set_media(&mut self, media: &MediaReference);
    fn prepare(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, position_ms: u64);
    fn current_position(&self) -> u64;
    /// `None` until the engine has loaded enough of the media to know it.
    fn duration(&self) -> Option<u64>;
    fn playback_state(&self) -> EngineState;
    fn is_playing(&self) -> bool;
    fn video_size(&self) -> Option<VideoSize>;
    fn set_listener(&mut self, listener: EngineListener);
    fn clear_listener(&mut self);
    /// Frees the underlying player. Every later call must be inert.
    fn release(&mut self);
}

/// Builds engine instances for new sessions.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn MediaEngine>;
}
