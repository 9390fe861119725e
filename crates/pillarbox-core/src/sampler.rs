use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::engine::{EngineEvent, EngineListener, SharedEngine};

/// Cadence of position notifications while playing.
pub const POSITION_INTERVAL: Duration = Duration::from_millis(500);

/// Periodic task posting the engine position into the session's event queue.
///
/// Runs for the whole session lifetime and skips ticks while the engine is not
/// playing. Must be stopped before the engine is released.
pub struct PositionSampler {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl PositionSampler {
    pub fn spawn(engine: SharedEngine, events: EngineListener, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let stop = shutdown.clone();

        let task = tokio::spawn(async move {
            // First sample one period after creation.
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop.notified() => break,
                    _ = tick.tick() => {
                        let position = {
                            let engine = engine.lock().await;
                            engine.is_playing().then(|| engine.current_position())
                        };
                        if let Some(position) = position {
                            if events.send(EngineEvent::PositionTick(position)).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancels the timer and waits until the task is gone. Later calls are no-ops.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.shutdown.notify_one();
        task.abort();
        let _ = task.await;
    }
}

impl Drop for PositionSampler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
