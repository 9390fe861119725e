use std::collections::HashMap;

use pillarbox_core::events::SessionEvent;
use pillarbox_core::ChannelEffect;
use pillarbox_models::channel::ChannelName;

/// One method-channel peer and the channels it created.
pub struct Connection {
    pub connection_id: String,
    /// Owned channels and the generation each was opened with.
    owned: HashMap<ChannelName, u64>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().to_string(),
            owned: HashMap::new(),
        }
    }

    /// Events are pushed only to the peer that created the channel, and only
    /// from the incarnation it created.
    pub fn should_receive_event(&self, event: &SessionEvent) -> bool {
        self.owned.get(&event.channel) == Some(&event.generation)
    }

    pub fn apply(&mut self, effect: ChannelEffect) {
        match effect {
            ChannelEffect::Opened { channel, generation } => {
                self.owned.insert(channel, generation);
            }
            ChannelEffect::Closed(channel) => {
                self.owned.remove(&channel);
            }
        }
    }

    /// Empties the owned set, for teardown on disconnect.
    pub fn take_owned(&mut self) -> Vec<ChannelName> {
        self.owned.drain().map(|(channel, _)| channel).collect()
    }
}
