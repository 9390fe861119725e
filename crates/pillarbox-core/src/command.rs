use pillarbox_models::channel::{METHOD_PAUSE, METHOD_PLAY};

use crate::error::CoreError;

/// Commands accepted on a session channel.
///
/// Acknowledged as soon as the engine has been told; the resulting state
/// changes arrive later on the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start playback, from the beginning if the media has ended.
    Play,
    Pause,
}

impl SessionCommand {
    pub fn parse(method: &str) -> Result<Self, CoreError> {
        match method {
            METHOD_PLAY => Ok(SessionCommand::Play),
            METHOD_PAUSE => Ok(SessionCommand::Pause),
            other => Err(CoreError::NotImplemented(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods() {
        assert_eq!(SessionCommand::parse("play").unwrap(), SessionCommand::Play);
        assert_eq!(SessionCommand::parse("pause").unwrap(), SessionCommand::Pause);
    }

    #[test]
    fn other_methods_are_not_implemented() {
        let err = SessionCommand::parse("seek").unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented(ref m) if m == "seek"));
    }
}
