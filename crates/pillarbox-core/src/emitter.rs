use pillarbox_models::channel::ChannelName;
use pillarbox_models::events::PlaybackEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{EngineEvent, SharedEngine};
use crate::events::EventBus;
use crate::session::SessionProfile;

/// Translates a session's engine events into pushed notifications.
pub struct EventEmitter {
    task: Option<JoinHandle<()>>,
}

impl EventEmitter {
    pub fn spawn(
        channel: ChannelName,
        generation: u64,
        profile: SessionProfile,
        engine: SharedEngine,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
        bus: EventBus,
    ) -> Self {
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    EngineEvent::StateChanged(state) => {
                        bus.publish(channel, generation, PlaybackEvent::State(state.label()));
                        if profile.reports_duration() {
                            // Re-queried on every transition: it is only known once ready.
                            let duration = engine.lock().await.duration();
                            bus.publish(channel, generation, PlaybackEvent::Duration(duration));
                        }
                    }
                    EngineEvent::VideoSizeChanged(size) => {
                        if profile.reports_video_size() {
                            bus.publish(channel, generation, PlaybackEvent::VideoSize(size));
                        }
                    }
                    EngineEvent::IsPlayingChanged(playing) => {
                        bus.publish(channel, generation, PlaybackEvent::IsPlaying(playing));
                    }
                    EngineEvent::PositionTick(position) => {
                        bus.publish(channel, generation, PlaybackEvent::Position(position));
                    }
                }
            }
            tracing::debug!(channel = ?channel, "event queue closed");
        });

        Self { task: Some(task) }
    }

    /// Stops forwarding. Events still queued are dropped.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for EventEmitter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
