//! Clock-driven engine used when no native player is linked in.
//!
//! Buffering, readiness and end-of-media are driven by the tokio clock, so
//! tests can run it under a paused runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pillarbox_models::media::MediaReference;
use pillarbox_models::playback::VideoSize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{EngineEvent, EngineFactory, EngineListener, EngineState, MediaEngine};

const DRIVER_TICK: Duration = Duration::from_millis(20);
const PLAYABLE_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// What every simulated media item looks like once loaded.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    pub buffering: Duration,
    pub duration: Duration,
    pub video_size: VideoSize,
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self {
            buffering: Duration::from_millis(250),
            duration: Duration::from_secs(60),
            video_size: VideoSize {
                height: 1080,
                width: 1920,
            },
        }
    }
}

pub struct SimulatedEngineFactory {
    media: SimulatedMedia,
}

impl SimulatedEngineFactory {
    pub fn new(media: SimulatedMedia) -> Self {
        Self { media }
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(&self) -> Box<dyn MediaEngine> {
        Box::new(SimulatedEngine::new(self.media.clone()))
    }
}

struct SimState {
    media: SimulatedMedia,
    source: Option<MediaReference>,
    prepared: bool,
    state: EngineState,
    play_when_ready: bool,
    /// Position at `anchor`, or the frozen position when not playing.
    position_ms: u64,
    anchor: Option<Instant>,
    ready_at: Option<Instant>,
    duration_ms: Option<u64>,
    video_size: Option<VideoSize>,
    listener: Option<EngineListener>,
    released: bool,
}

impl SimState {
    fn is_playing(&self) -> bool {
        !self.released && self.play_when_ready && self.state == EngineState::Ready
    }

    fn position_at(&self, now: Instant) -> u64 {
        let elapsed = self
            .anchor
            .map(|anchor| now.saturating_duration_since(anchor).as_millis() as u64)
            .unwrap_or(0);
        let position = self.position_ms + elapsed;
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(listener) = &self.listener {
            let _ = listener.send(event);
        }
    }

    /// Applies `change` and reports the state and is-playing transitions it caused.
    fn transition(&mut self, now: Instant, change: impl FnOnce(&mut SimState)) {
        self.position_ms = self.position_at(now);
        let was_state = self.state;
        let was_playing = self.is_playing();

        change(self);

        let playing = self.is_playing();
        self.anchor = playing.then_some(now);
        if self.state != was_state {
            self.emit(EngineEvent::StateChanged(self.state));
        }
        if playing != was_playing {
            self.emit(EngineEvent::IsPlayingChanged(playing));
        }
    }

    fn start_loading(&mut self, now: Instant) {
        self.position_ms = 0;
        self.duration_ms = None;
        self.video_size = None;
        self.ready_at = None;
        match &self.source {
            None => self.state = EngineState::Idle,
            Some(source) if !is_playable(source) => self.state = EngineState::Error,
            Some(_) => {
                self.state = EngineState::Buffering;
                self.ready_at = Some(now + self.media.buffering);
            }
        }
    }

    fn advance(&mut self, now: Instant) {
        if self.state == EngineState::Buffering && self.ready_at.is_some_and(|at| now >= at) {
            let size = self.media.video_size;
            let duration = self.media.duration.as_millis() as u64;
            self.transition(now, |s| {
                s.ready_at = None;
                s.duration_ms = Some(duration);
                s.video_size = Some(size);
                s.state = EngineState::Ready;
            });
            self.emit(EngineEvent::VideoSizeChanged(size));
        }

        if let Some(duration) = self.duration_ms {
            if self.is_playing() && self.position_at(now) >= duration {
                self.transition(now, |s| s.state = EngineState::Ended);
            }
        }
    }
}

fn is_playable(source: &MediaReference) -> bool {
    match source {
        MediaReference::Urn(_) => true,
        MediaReference::Url(_) => source
            .url()
            .is_some_and(|url| PLAYABLE_SCHEMES.contains(&url.scheme())),
    }
}

fn lock(shared: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SimulatedEngine {
    shared: Arc<Mutex<SimState>>,
    driver: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    pub fn new(media: SimulatedMedia) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimState {
                media,
                source: None,
                prepared: false,
                state: EngineState::Idle,
                play_when_ready: false,
                position_ms: 0,
                anchor: None,
                ready_at: None,
                duration_ms: None,
                video_size: None,
                listener: None,
                released: false,
            })),
            driver: None,
        }
    }

    /// Runs `f` against the live state, after catching up with the clock.
    /// Does nothing once the engine is released.
    fn update(&self, f: impl FnOnce(&mut SimState, Instant)) {
        let mut state = lock(&self.shared);
        if state.released {
            return;
        }
        let now = Instant::now();
        state.advance(now);
        f(&mut state, now);
    }

    fn ensure_driver(&mut self) {
        if self.driver.is_some() {
            return;
        }
        let shared = self.shared.clone();
        self.driver = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(DRIVER_TICK);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let mut state = lock(&shared);
                if state.released {
                    break;
                }
                state.advance(Instant::now());
            }
        }));
    }
}

impl MediaEngine for SimulatedEngine {
    fn set_media(&mut self, media: &MediaReference) {
        let media = media.clone();
        self.update(|state, now| {
            let reload = state.prepared;
            state.transition(now, |s| {
                s.source = Some(media);
                if reload {
                    s.start_loading(now);
                }
            });
        });
    }

    fn prepare(&mut self) {
        let mut first = false;
        self.update(|state, now| {
            if state.prepared {
                return;
            }
            first = true;
            state.transition(now, |s| {
                s.prepared = true;
                s.start_loading(now);
            });
        });
        if first {
            self.ensure_driver();
        }
    }

    fn play(&mut self) {
        self.update(|state, now| state.transition(now, |s| s.play_when_ready = true));
    }

    fn pause(&mut self) {
        self.update(|state, now| state.transition(now, |s| s.play_when_ready = false));
    }

    fn seek_to(&mut self, position_ms: u64) {
        self.update(|state, now| {
            state.transition(now, |s| {
                s.position_ms = match s.duration_ms {
                    Some(duration) => position_ms.min(duration),
                    None => position_ms,
                };
                if s.state == EngineState::Ended {
                    s.state = EngineState::Ready;
                }
            });
        });
    }

    fn current_position(&self) -> u64 {
        let state = lock(&self.shared);
        if state.released {
            return 0;
        }
        state.position_at(Instant::now())
    }

    fn duration(&self) -> Option<u64> {
        let state = lock(&self.shared);
        if state.released {
            return None;
        }
        state.duration_ms
    }

    fn playback_state(&self) -> EngineState {
        let state = lock(&self.shared);
        if state.released {
            return EngineState::Idle;
        }
        state.state
    }

    fn is_playing(&self) -> bool {
        lock(&self.shared).is_playing()
    }

    fn video_size(&self) -> Option<VideoSize> {
        let state = lock(&self.shared);
        if state.released {
            return None;
        }
        state.video_size
    }

    fn set_listener(&mut self, listener: EngineListener) {
        let mut state = lock(&self.shared);
        if !state.released {
            state.listener = Some(listener);
        }
    }

    fn clear_listener(&mut self) {
        lock(&self.shared).listener = None;
    }

    fn release(&mut self) {
        {
            let mut state = lock(&self.shared);
            state.released = true;
            state.listener = None;
            state.play_when_ready = false;
            state.anchor = None;
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn media() -> SimulatedMedia {
        SimulatedMedia {
            buffering: Duration::from_millis(100),
            duration: Duration::from_secs(2),
            video_size: VideoSize {
                height: 720,
                width: 1280,
            },
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn prepared(source: &str) -> (SimulatedEngine, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut engine = SimulatedEngine::new(media());
        engine.set_listener(tx);
        engine.set_media(&MediaReference::parse(source));
        engine.prepare();
        (engine, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn buffers_then_becomes_ready() {
        let (engine, mut rx) = prepared("https://example/video.mp4");
        assert_eq!(drain(&mut rx), vec![EngineEvent::StateChanged(EngineState::Buffering)]);
        assert_eq!(engine.duration(), None);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                EngineEvent::StateChanged(EngineState::Ready),
                EngineEvent::VideoSizeChanged(VideoSize {
                    height: 720,
                    width: 1280
                }),
            ]
        );
        assert_eq!(engine.duration(), Some(2000));
        assert!(!engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_the_end() {
        let (mut engine, mut rx) = prepared("urn:rts:video:1");
        tokio::time::sleep(Duration::from_millis(150)).await;
        drain(&mut rx);

        engine.play();
        assert_eq!(drain(&mut rx), vec![EngineEvent::IsPlayingChanged(true)]);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let position = engine.current_position();
        assert!((950..=1050).contains(&position), "position {position}");

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                EngineEvent::StateChanged(EngineState::Ended),
                EngineEvent::IsPlayingChanged(false),
            ]
        );
        assert_eq!(engine.playback_state(), EngineState::Ended);
        assert_eq!(engine.current_position(), 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_from_ended_returns_to_ready() {
        let (mut engine, mut rx) = prepared("https://example/video.mp4");
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.seek_to(1990);
        engine.play();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.playback_state(), EngineState::Ended);
        drain(&mut rx);

        engine.pause();
        engine.seek_to(0);
        assert_eq!(drain(&mut rx), vec![EngineEvent::StateChanged(EngineState::Ready)]);
        assert_eq!(engine.current_position(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_position() {
        let (mut engine, _rx) = prepared("https://example/video.mp4");
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.play();
        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.pause();
        let frozen = engine.current_position();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(engine.current_position(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_scheme_fails() {
        let (engine, mut rx) = prepared("ftp://example/video.mp4");
        assert_eq!(drain(&mut rx), vec![EngineEvent::StateChanged(EngineState::Error)]);
        assert_eq!(engine.playback_state(), EngineState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn released_engine_is_inert() {
        let (mut engine, mut rx) = prepared("https://example/video.mp4");
        drain(&mut rx);
        engine.release();
        engine.play();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut rx).is_empty());
        assert!(!engine.is_playing());
        assert_eq!(engine.duration(), None);
    }
}
