use serde_json::{json, Value};

use crate::playback::{PlaybackStateLabel, PositionEventName, VideoSize};

// Pushed event names
pub const EVENT_STATE: &str = "state";
pub const EVENT_DURATION: &str = "duration";
pub const EVENT_VIDEO_SIZE: &str = "video_size";
pub const EVENT_IS_PLAYING: &str = "is_playing";

/// A notification pushed on a session channel.
///
/// Each variant is delivered as its own frame; the remote side must not assume
/// that consecutive notifications describe one atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    State(PlaybackStateLabel),
    /// Milliseconds, `None` while the engine does not know it yet.
    Duration(Option<u64>),
    VideoSize(VideoSize),
    IsPlaying(bool),
    /// Sampled playback position in milliseconds.
    Position(u64),
}

impl PlaybackEvent {
    pub fn method(&self, position: PositionEventName) -> &'static str {
        match self {
            PlaybackEvent::State(_) => EVENT_STATE,
            PlaybackEvent::Duration(_) => EVENT_DURATION,
            PlaybackEvent::VideoSize(_) => EVENT_VIDEO_SIZE,
            PlaybackEvent::IsPlaying(_) => EVENT_IS_PLAYING,
            PlaybackEvent::Position(_) => position.as_str(),
        }
    }

    pub fn args(&self) -> Value {
        match self {
            PlaybackEvent::State(label) => json!(label.as_str()),
            PlaybackEvent::Duration(ms) => json!(ms),
            PlaybackEvent::VideoSize(size) => json!({"height": size.height, "width": size.width}),
            PlaybackEvent::IsPlaying(playing) => json!(if *playing { "true" } else { "false" }),
            PlaybackEvent::Position(ms) => json!(ms),
        }
    }
}
