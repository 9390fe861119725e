pub mod channel;
pub mod error;
pub mod events;
pub mod media;
pub mod playback;

/// Caller-assigned identifier of a playback session.
pub type SessionId = i64;

/// Caller-assigned identifier of a rendering surface.
pub type ViewId = i64;
