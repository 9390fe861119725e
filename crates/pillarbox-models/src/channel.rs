//! Method-channel frames exchanged with the remote UI.
//!
//! Wire format: one JSON object per text message, tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;
use crate::{SessionId, ViewId};

// Control channel methods
pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_DISPOSE: &str = "dispose";

// Session channel methods
pub const METHOD_PLAY: &str = "play";
pub const METHOD_PAUSE: &str = "pause";

// View factory channel methods
pub const METHOD_CREATE: &str = "create";

pub const DEFAULT_NAMESPACE: &str = "pillarbox";
pub const DEFAULT_VIEW_NAMESPACE: &str = "pillarbox-view";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Frames carried over the method-channel transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelFrame {
    /// Client invokes `method` on `channel`.
    Call {
        id: u64,
        channel: String,
        method: String,
        #[serde(default)]
        args: Value,
    },

    /// Successful reply to the call with the same `id`.
    Success {
        id: u64,
        #[serde(default)]
        result: Value,
    },

    /// Failed reply to the call with the same `id`.
    Error {
        id: u64,
        code: ErrorCode,
        message: String,
    },

    /// Server-pushed notification. No reply is expected.
    Event {
        channel: String,
        method: String,
        #[serde(default)]
        args: Value,
    },
}

impl ChannelFrame {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A channel name resolved against the configured namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// `<namespace>`: initialize / dispose.
    Control,
    /// `<namespace>/<identifier>`: play / pause for one session.
    Session(SessionId),
    /// `<view_namespace>`: create / dispose rendering surfaces.
    ViewFactory,
    /// `<view_namespace>/<view_id>`: play / pause for a standalone view.
    View(ViewId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNamespaces {
    pub control: String,
    pub view: String,
}

impl Default for ChannelNamespaces {
    fn default() -> Self {
        Self {
            control: DEFAULT_NAMESPACE.to_string(),
            view: DEFAULT_VIEW_NAMESPACE.to_string(),
        }
    }
}

impl ChannelNamespaces {
    pub fn resolve(&self, name: &str) -> Option<ChannelName> {
        if name == self.control {
            return Some(ChannelName::Control);
        }
        if name == self.view {
            return Some(ChannelName::ViewFactory);
        }
        let (prefix, suffix) = name.rsplit_once('/')?;
        let id = suffix.parse::<i64>().ok()?;
        if prefix == self.control {
            Some(ChannelName::Session(id))
        } else if prefix == self.view {
            Some(ChannelName::View(id))
        } else {
            None
        }
    }

    pub fn format(&self, channel: ChannelName) -> String {
        match channel {
            ChannelName::Control => self.control.clone(),
            ChannelName::Session(id) => format!("{}/{}", self.control, id),
            ChannelName::ViewFactory => self.view.clone(),
            ChannelName::View(id) => format!("{}/{}", self.view, id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArgs {
    pub identifier: SessionId,
    pub data_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposeArgs {
    pub identifier: SessionId,
}

/// Where a rendering surface gets its player from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewSource {
    /// Attach to the engine of an already-initialized session.
    Shared { identifier: SessionId },
    /// Own a dedicated engine playing `uri`.
    Standalone { uri: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateViewArgs {
    pub view_id: ViewId,
    #[serde(flatten)]
    pub source: ViewSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposeViewArgs {
    pub view_id: ViewId,
}

/// Result string returned by initialize and dispose.
pub fn live_sessions_message(count: usize) -> String {
    format!("{count} pillarbox sessions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_channel_names() {
        let ns = ChannelNamespaces::default();
        assert_eq!(ns.resolve("pillarbox"), Some(ChannelName::Control));
        assert_eq!(ns.resolve("pillarbox/42"), Some(ChannelName::Session(42)));
        assert_eq!(ns.resolve("pillarbox-view"), Some(ChannelName::ViewFactory));
        assert_eq!(ns.resolve("pillarbox-view/7"), Some(ChannelName::View(7)));
        assert_eq!(ns.resolve("pillarbox/abc"), None);
        assert_eq!(ns.resolve("other/1"), None);
        assert_eq!(ns.format(ChannelName::Session(-3)), "pillarbox/-3");
    }

    #[test]
    fn decodes_call_without_args() {
        let frame =
            ChannelFrame::decode(r#"{"type":"call","id":5,"channel":"pillarbox/1","method":"play"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ChannelFrame::Call {
                id: 5,
                channel: "pillarbox/1".into(),
                method: "play".into(),
                args: Value::Null,
            }
        );
    }

    #[test]
    fn ack_encodes_null_result() {
        let text = ChannelFrame::Success { id: 9, result: Value::Null }.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "success", "id": 9, "result": null}));
    }

    #[test]
    fn initialize_args_use_camel_case() {
        let args: InitializeArgs =
            serde_json::from_value(json!({"identifier": 1, "dataSource": "urn:rts:video:1"}))
                .unwrap();
        assert_eq!(args.identifier, 1);
        assert_eq!(args.data_source, "urn:rts:video:1");
    }

    #[test]
    fn view_source_variants() {
        let shared: CreateViewArgs =
            serde_json::from_value(json!({"view_id": 3, "identifier": 1})).unwrap();
        assert_eq!(shared.source, ViewSource::Shared { identifier: 1 });

        let standalone: CreateViewArgs =
            serde_json::from_value(json!({"view_id": 4, "uri": "https://example/v.mp4"})).unwrap();
        assert_eq!(
            standalone.source,
            ViewSource::Standalone { uri: "https://example/v.mp4".into() }
        );

        assert!(serde_json::from_value::<CreateViewArgs>(json!({"view_id": 5})).is_err());
    }
}
