#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pillarbox_core::engine::{EngineEvent, EngineFactory, EngineListener, EngineState, MediaEngine};
use pillarbox_core::events::{EventBus, SessionEvent};
use pillarbox_core::{DuplicatePolicy, SessionRegistry};
use pillarbox_models::events::PlaybackEvent;
use pillarbox_models::media::MediaReference;
use pillarbox_models::playback::VideoSize;
use tokio::sync::broadcast;

/// Engine calls recorded by [`RecordingEngine`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetMedia(String),
    Prepare,
    Play,
    Pause,
    SeekTo(u64),
    ClearListener,
    Release,
}

struct RecordingState {
    calls: Vec<Call>,
    state: EngineState,
    playing: bool,
    position: u64,
    duration: Option<u64>,
    video_size: Option<VideoSize>,
    listener: Option<EngineListener>,
}

/// Test-side handle onto a recording engine owned by a session.
#[derive(Clone)]
pub struct RecordingHandle {
    shared: Arc<Mutex<RecordingState>>,
}

impl RecordingHandle {
    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.shared.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn set_duration(&self, duration: Option<u64>) {
        self.lock().duration = duration;
    }

    pub fn set_position(&self, position: u64) {
        self.lock().position = position;
    }

    pub fn has_listener(&self) -> bool {
        self.lock().listener.is_some()
    }

    /// Moves the engine and raises the matching event, like a real player would.
    pub fn fire(&self, event: EngineEvent) {
        let mut state = self.lock();
        match event {
            EngineEvent::StateChanged(next) => state.state = next,
            EngineEvent::IsPlayingChanged(playing) => state.playing = playing,
            EngineEvent::VideoSizeChanged(size) => state.video_size = Some(size),
            EngineEvent::PositionTick(position) => state.position = position,
        }
        if let Some(listener) = &state.listener {
            let _ = listener.send(event);
        }
    }
}

/// Passive engine: records calls and only raises events when told to.
pub struct RecordingEngine {
    handle: RecordingHandle,
}

impl RecordingEngine {
    fn record(&self, call: Call) {
        self.handle.lock().calls.push(call);
    }
}

impl MediaEngine for RecordingEngine {
    fn set_media(&mut self, media: &MediaReference) {
        self.record(Call::SetMedia(media.to_string()));
    }

    fn prepare(&mut self) {
        self.record(Call::Prepare);
    }

    fn play(&mut self) {
        self.record(Call::Play);
        self.handle.lock().playing = true;
    }

    fn pause(&mut self) {
        self.record(Call::Pause);
        self.handle.lock().playing = false;
    }

    fn seek_to(&mut self, position_ms: u64) {
        self.record(Call::SeekTo(position_ms));
        self.handle.lock().position = position_ms;
    }

    fn current_position(&self) -> u64 {
        self.handle.lock().position
    }

    fn duration(&self) -> Option<u64> {
        self.handle.lock().duration
    }

    fn playback_state(&self) -> EngineState {
        self.handle.lock().state
    }

    fn is_playing(&self) -> bool {
        self.handle.lock().playing
    }

    fn video_size(&self) -> Option<VideoSize> {
        self.handle.lock().video_size
    }

    fn set_listener(&mut self, listener: EngineListener) {
        self.handle.lock().listener = Some(listener);
    }

    fn clear_listener(&mut self) {
        self.record(Call::ClearListener);
        self.handle.lock().listener = None;
    }

    fn release(&mut self) {
        self.record(Call::Release);
        let mut state = self.handle.lock();
        state.listener = None;
        state.playing = false;
    }
}

#[derive(Default)]
pub struct RecordingFactory {
    created: Mutex<Vec<RecordingHandle>>,
}

impl RecordingFactory {
    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> RecordingHandle {
        self.created.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> RecordingHandle {
        self.created.lock().unwrap().last().cloned().unwrap()
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&self) -> Box<dyn MediaEngine> {
        let handle = RecordingHandle {
            shared: Arc::new(Mutex::new(RecordingState {
                calls: Vec::new(),
                state: EngineState::Idle,
                playing: false,
                position: 0,
                duration: None,
                video_size: None,
                listener: None,
            })),
        };
        self.created.lock().unwrap().push(handle.clone());
        Box::new(RecordingEngine { handle })
    }
}

pub struct RecordingContext {
    pub factory: Arc<RecordingFactory>,
    pub bus: EventBus,
    pub registry: SessionRegistry,
}

impl RecordingContext {
    pub fn new(policy: DuplicatePolicy) -> Self {
        let factory = Arc::new(RecordingFactory::default());
        let bus = EventBus::new(1024);
        let registry = SessionRegistry::new(factory.clone(), bus.clone(), policy);
        Self {
            factory,
            bus,
            registry,
        }
    }
}

/// Everything currently queued on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn playback_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<PlaybackEvent> {
    drain(rx).into_iter().map(|e| e.event).collect()
}

/// Lets spawned tasks run without moving the paused clock far.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
