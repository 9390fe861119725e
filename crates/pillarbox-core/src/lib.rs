pub mod bridge;
pub mod command;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod sampler;
pub mod session;
pub mod view;

use pillarbox_models::channel::ChannelNamespaces;
use pillarbox_models::playback::PositionEventName;

pub use bridge::{Bridge, ChannelEffect, Reply};
pub use error::CoreError;
pub use registry::{DuplicatePolicy, SessionCreated, SessionRegistry};

/// Default capacity of the session event bus.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub namespaces: ChannelNamespaces,
    pub position_event: PositionEventName,
    pub duplicate_policy: DuplicatePolicy,
    pub event_bus_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespaces: ChannelNamespaces::default(),
            position_event: PositionEventName::default(),
            duplicate_policy: DuplicatePolicy::default(),
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
        }
    }
}
