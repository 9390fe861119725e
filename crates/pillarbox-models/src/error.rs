use serde::{Deserialize, Serialize};

/// Error codes carried by `error` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DuplicateSession,
    DuplicateView,
    SessionNotFound,
    ViewNotFound,
    NotImplemented,
    InvalidArguments,
    UnknownChannel,
    MalformedFrame,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateSession => "duplicate_session",
            ErrorCode::DuplicateView => "duplicate_view",
            ErrorCode::SessionNotFound => "session_not_found",
            ErrorCode::ViewNotFound => "view_not_found",
            ErrorCode::NotImplemented => "not_implemented",
            ErrorCode::InvalidArguments => "invalid_arguments",
            ErrorCode::UnknownChannel => "unknown_channel",
            ErrorCode::MalformedFrame => "malformed_frame",
        }
    }
}
