use pillarbox_models::channel::{ChannelFrame, ChannelName, ChannelNamespaces};
use pillarbox_models::events::PlaybackEvent;
use pillarbox_models::playback::PositionEventName;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    /// Session or standalone-view channel the event belongs to.
    pub channel: ChannelName,
    /// Which incarnation of `channel` produced the event. A disposed and
    /// re-created identifier gets a new generation.
    pub generation: u64,
    pub event: PlaybackEvent,
}

impl SessionEvent {
    pub fn to_frame(&self, namespaces: &ChannelNamespaces, position: PositionEventName) -> ChannelFrame {
        ChannelFrame::Event {
            channel: namespaces.format(self.channel),
            method: self.event.method(position).to_string(),
            args: self.event.args(),
        }
    }
}

/// Broadcast-based bus carrying session notifications to every transport.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    generations: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            generations: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocates a generation no earlier channel incarnation has used.
    pub fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    pub fn publish(&self, channel: ChannelName, generation: u64, event: PlaybackEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(SessionEvent {
            channel,
            generation,
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::DEFAULT_EVENT_BUS_CAPACITY)
    }
}
