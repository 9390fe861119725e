use std::sync::Arc;

use pillarbox_models::channel::{
    live_sessions_message, ChannelFrame, ChannelName, CreateViewArgs, DisposeArgs,
    DisposeViewArgs, InitializeArgs, METHOD_CREATE, METHOD_DISPOSE, METHOD_INITIALIZE,
};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::command::SessionCommand;
use crate::engine::EngineFactory;
use crate::error::CoreError;
use crate::events::{EventBus, SessionEvent};
use crate::registry::SessionRegistry;
use crate::view::{SurfaceFactory, ViewBinder};
use crate::BridgeConfig;

/// Ownership change caused by a call, for transports that track which
/// channels a peer created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEffect {
    /// A channel came up; only its events of `generation` belong to the caller.
    Opened { channel: ChannelName, generation: u64 },
    Closed(ChannelName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub result: Value,
    pub effect: Option<ChannelEffect>,
}

impl Reply {
    fn ack() -> Self {
        Self {
            result: Value::Null,
            effect: None,
        }
    }
}

/// Routes method-channel calls to the session registry and the view binder.
pub struct Bridge {
    config: BridgeConfig,
    bus: EventBus,
    registry: SessionRegistry,
    views: ViewBinder,
}

impl Bridge {
    pub fn new(config: BridgeConfig, engines: Arc<dyn EngineFactory>, surfaces: Arc<dyn SurfaceFactory>) -> Self {
        let bus = EventBus::new(config.event_bus_capacity);
        let registry = SessionRegistry::new(engines.clone(), bus.clone(), config.duplicate_policy);
        let views = ViewBinder::new(surfaces, engines, bus.clone());
        Self {
            config,
            bus,
            registry,
            views,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn views(&self) -> &ViewBinder {
        &self.views
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    pub fn event_frame(&self, event: &SessionEvent) -> ChannelFrame {
        event.to_frame(&self.config.namespaces, self.config.position_event)
    }

    pub async fn handle_call(&self, channel: &str, method: &str, args: Value) -> Result<Reply, CoreError> {
        let name = self
            .config
            .namespaces
            .resolve(channel)
            .ok_or_else(|| CoreError::UnknownChannel(channel.to_string()))?;

        match name {
            ChannelName::Control => self.handle_control(method, args).await,
            ChannelName::Session(id) => {
                let command = SessionCommand::parse(method)?;
                self.registry.execute(id, command).await?;
                Ok(Reply::ack())
            }
            ChannelName::ViewFactory => self.handle_view_factory(method, args).await,
            ChannelName::View(view_id) => {
                let command = SessionCommand::parse(method)?;
                self.views.execute(view_id, command).await?;
                Ok(Reply::ack())
            }
        }
    }

    async fn handle_control(&self, method: &str, args: Value) -> Result<Reply, CoreError> {
        match method {
            METHOD_INITIALIZE => {
                let args: InitializeArgs = serde_json::from_value(args)?;
                let created = self.registry.create(args.identifier, &args.data_source).await?;
                Ok(Reply {
                    result: Value::String(live_sessions_message(created.live)),
                    effect: Some(ChannelEffect::Opened {
                        channel: ChannelName::Session(args.identifier),
                        generation: created.generation,
                    }),
                })
            }
            METHOD_DISPOSE => {
                let args: DisposeArgs = serde_json::from_value(args)?;
                let live = self.registry.dispose(args.identifier).await;
                Ok(Reply {
                    result: Value::String(live_sessions_message(live)),
                    effect: Some(ChannelEffect::Closed(ChannelName::Session(args.identifier))),
                })
            }
            other => Err(CoreError::NotImplemented(other.to_string())),
        }
    }

    async fn handle_view_factory(&self, method: &str, args: Value) -> Result<Reply, CoreError> {
        match method {
            METHOD_CREATE => {
                let args: CreateViewArgs = serde_json::from_value(args)?;
                let generation = self.views.create(&self.registry, args.view_id, args.source).await?;
                Ok(Reply {
                    result: Value::Null,
                    effect: Some(ChannelEffect::Opened {
                        channel: ChannelName::View(args.view_id),
                        generation,
                    }),
                })
            }
            METHOD_DISPOSE => {
                let args: DisposeViewArgs = serde_json::from_value(args)?;
                self.views.dispose(args.view_id).await;
                Ok(Reply {
                    result: Value::Null,
                    effect: Some(ChannelEffect::Closed(ChannelName::View(args.view_id))),
                })
            }
            other => Err(CoreError::NotImplemented(other.to_string())),
        }
    }

    /// Disposes whatever stands behind a channel a departed peer owned.
    pub async fn release_channel(&self, channel: ChannelName) {
        match channel {
            ChannelName::Session(id) => {
                self.registry.dispose(id).await;
            }
            ChannelName::View(view_id) => {
                self.views.dispose(view_id).await;
            }
            ChannelName::Control | ChannelName::ViewFactory => {}
        }
    }

    /// Disposes every view and session.
    pub async fn shutdown(&self) {
        let views = self.views.dispose_all().await;
        let sessions = self.registry.dispose_all().await;
        tracing::info!(views, sessions, "bridge shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SimulatedEngineFactory, SimulatedMedia};
    use crate::view::HeadlessSurfaceFactory;
    use pillarbox_models::error::ErrorCode;
    use serde_json::json;

    fn bridge() -> Bridge {
        Bridge::new(
            BridgeConfig::default(),
            Arc::new(SimulatedEngineFactory::new(SimulatedMedia::default())),
            Arc::new(HeadlessSurfaceFactory),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_reports_live_count_and_opens_channel() {
        let bridge = bridge();
        let reply = bridge
            .handle_call(
                "pillarbox",
                "initialize",
                json!({"identifier": 1, "dataSource": "https://example/video.mp4"}),
            )
            .await
            .unwrap();
        assert_eq!(reply.result, json!("1 pillarbox sessions"));
        assert!(matches!(
            reply.effect,
            Some(ChannelEffect::Opened {
                channel: ChannelName::Session(1),
                ..
            })
        ));

        let reply = bridge.handle_call("pillarbox/1", "play", Value::Null).await.unwrap();
        assert_eq!(reply, Reply::ack());

        bridge.shutdown().await;
        assert!(bridge.registry().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_map_to_wire_codes() {
        let bridge = bridge();
        let cases = [
            ("elsewhere", "play", Value::Null, ErrorCode::UnknownChannel),
            ("pillarbox/5", "play", Value::Null, ErrorCode::SessionNotFound),
            ("pillarbox/5", "seek", Value::Null, ErrorCode::NotImplemented),
            ("pillarbox", "reset", Value::Null, ErrorCode::NotImplemented),
            ("pillarbox", "initialize", json!({"identifier": "x"}), ErrorCode::InvalidArguments),
            (
                "pillarbox-view",
                "create",
                json!({"view_id": 1, "identifier": 5}),
                ErrorCode::SessionNotFound,
            ),
        ];
        for (channel, method, args, code) in cases {
            let err = bridge.handle_call(channel, method, args).await.unwrap_err();
            assert_eq!(err.code(), code, "{channel} {method}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheme_less_source_reports_unknown_state() {
        let bridge = bridge();
        let mut rx = bridge.subscribe();
        let reply = bridge
            .handle_call(
                "pillarbox",
                "initialize",
                json!({"identifier": 2, "dataSource": "assets/video.mp4"}),
            )
            .await
            .unwrap();
        assert_eq!(reply.result, json!("1 pillarbox sessions"));

        let event = rx.recv().await.unwrap();
        assert_eq!(
            bridge.event_frame(&event),
            ChannelFrame::Event {
                channel: "pillarbox/2".into(),
                method: "state".into(),
                args: json!("unknown"),
            }
        );
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_of_unknown_session_is_a_no_op() {
        let bridge = bridge();
        let reply = bridge
            .handle_call("pillarbox", "dispose", json!({"identifier": 42}))
            .await
            .unwrap();
        assert_eq!(reply.result, json!("0 pillarbox sessions"));
    }

    #[tokio::test(start_paused = true)]
    async fn release_channel_disposes_owned_session() {
        let bridge = bridge();
        bridge
            .handle_call("pillarbox", "initialize", json!({"identifier": 3, "dataSource": "urn:rts:video:3"}))
            .await
            .unwrap();
        bridge.release_channel(ChannelName::Session(3)).await;
        assert!(!bridge.registry().contains(3).await);
    }
}
