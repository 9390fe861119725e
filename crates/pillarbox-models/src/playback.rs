use serde::{Deserialize, Serialize};

/// Playback state as reported to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStateLabel {
    Idle,
    Buffering,
    Ready,
    Ended,
    Unknown,
}

impl PlaybackStateLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStateLabel::Idle => "idle",
            PlaybackStateLabel::Buffering => "buffering",
            PlaybackStateLabel::Ready => "ready",
            PlaybackStateLabel::Ended => "ended",
            PlaybackStateLabel::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSize {
    pub height: u32,
    pub width: u32,
}

/// Name under which sampled positions are pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionEventName {
    #[default]
    CurrentPosition,
    Position,
}

impl PositionEventName {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionEventName::CurrentPosition => "current_position",
            PositionEventName::Position => "position",
        }
    }
}

/// Point-in-time view of a session's engine. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStateSnapshot {
    pub state: PlaybackStateLabel,
    pub is_playing: bool,
    pub position_millis: u64,
    pub duration_millis: Option<u64>,
    pub video_width: u32,
    pub video_height: u32,
}
