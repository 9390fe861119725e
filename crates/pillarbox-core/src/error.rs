use pillarbox_models::error::ErrorCode;
use pillarbox_models::{SessionId, ViewId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("session {0} is already live")]
    DuplicateSession(SessionId),
    #[error("view {0} already exists")]
    DuplicateView(ViewId),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("view {0} not found")]
    ViewNotFound(ViewId),
    #[error("method '{0}' not implemented")]
    NotImplemented(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::DuplicateSession(_) => ErrorCode::DuplicateSession,
            CoreError::DuplicateView(_) => ErrorCode::DuplicateView,
            CoreError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            CoreError::ViewNotFound(_) => ErrorCode::ViewNotFound,
            CoreError::NotImplemented(_) => ErrorCode::NotImplemented,
            CoreError::InvalidArguments(_) => ErrorCode::InvalidArguments,
            CoreError::UnknownChannel(_) => ErrorCode::UnknownChannel,
        }
    }
}
