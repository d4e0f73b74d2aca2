// src/playback/testing.rs
use crate::playback::engine::{EngineError, EventSink, MediaEngine, ObserverHandle, Player};
use crate::podcast::{Episode, Feed, PodcastURL};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObserverKind {
    Tick,
    End,
}

/// Everything the fake engine has been asked to do, shared with the test.
#[derive(Default)]
pub(crate) struct EngineLog {
    pub live_players: usize,
    pub loaded: Vec<Url>,
    pub fail_loads: bool,
    pub calls: Vec<String>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    pub last_seek: Option<Duration>,
    pub tick_interval: Option<Duration>,
    pub next_token: u64,
    pub observers: Vec<(ObserverHandle, ObserverKind, EventSink)>,
    pub retired: Vec<(ObserverKind, EventSink)>,
}

/// Engine double. Clones share one log, so a test keeps a clone after moving
/// the original into the controller.
#[derive(Clone, Default)]
pub(crate) struct FakeEngine {
    log: Arc<Mutex<EngineLog>>,
}

pub(crate) struct FakePlayer {
    log: Arc<Mutex<EngineLog>>,
}

impl FakeEngine {
    pub fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }

    pub fn live_players(&self) -> usize {
        self.log().live_players
    }

    pub fn set_media(&self, position: Duration, duration: Option<Duration>) {
        let mut log = self.log();
        log.position = position;
        log.duration = duration;
    }

    fn sinks(&self, kind: ObserverKind) -> Vec<EventSink> {
        self.log().observers.iter().filter(|(_, k, _)| *k == kind).map(|(_, _, s)| s.clone()).collect()
    }

    pub fn fire_tick(&self) {
        for sink in self.sinks(ObserverKind::Tick) {
            sink.tick();
        }
    }

    pub fn fire_reached_end(&self) {
        for sink in self.sinks(ObserverKind::End) {
            sink.reached_end();
        }
    }

    /// Simulates callbacks an engine delivers late, after their observer was removed.
    pub fn fire_retired(&self) {
        let retired: Vec<(ObserverKind, EventSink)> = self.log().retired.clone();
        for (kind, sink) in retired {
            match kind {
                ObserverKind::Tick => sink.tick(),
                ObserverKind::End => sink.reached_end(),
            };
        }
    }
}

impl MediaEngine for FakeEngine {
    type Player = FakePlayer;

    fn load(&mut self, uri: &Url) -> Result<FakePlayer, EngineError> {
        let mut log = self.log();
        if log.fail_loads {
            return Err(EngineError::Load { uri: uri.to_string(), reason: "unsupported media".to_string() });
        }
        log.loaded.push(uri.clone());
        log.live_players += 1;
        log.position = Duration::ZERO;
        log.calls.push(format!("load {}", uri));
        Ok(FakePlayer { log: self.log.clone() })
    }
}

impl FakePlayer {
    fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }

    fn register(&mut self, kind: ObserverKind, sink: EventSink) -> ObserverHandle {
        let mut log = self.log();
        log.next_token += 1;
        let handle = ObserverHandle(log.next_token);
        log.observers.push((handle, kind, sink));
        log.calls.push(format!("observe {:?}", kind));
        handle
    }
}

impl Player for FakePlayer {
    fn play(&mut self) {
        let mut log = self.log();
        log.playing = true;
        log.calls.push("play".to_string());
    }

    fn pause(&mut self) {
        let mut log = self.log();
        log.playing = false;
        log.calls.push("pause".to_string());
    }

    fn seek(&mut self, position: Duration) {
        let mut log = self.log();
        log.position = position;
        log.last_seek = Some(position);
        log.calls.push("seek".to_string());
    }

    fn current_time(&self) -> Option<Duration> {
        Some(self.log().position)
    }

    fn duration(&self) -> Option<Duration> {
        self.log().duration
    }

    fn on_periodic_tick(&mut self, interval: Duration, sink: EventSink) -> ObserverHandle {
        self.log().tick_interval = Some(interval);
        self.register(ObserverKind::Tick, sink)
    }

    fn on_reached_end(&mut self, sink: EventSink) -> ObserverHandle {
        self.register(ObserverKind::End, sink)
    }

    fn remove_observer(&mut self, handle: ObserverHandle) {
        let mut log = self.log();
        if let Some(index) = log.observers.iter().position(|(h, _, _)| *h == handle) {
            let (_, kind, sink) = log.observers.remove(index);
            log.retired.push((kind, sink));
            log.calls.push(format!("remove {:?}", kind));
        }
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        let mut log = self.log();
        log.live_players -= 1;
        log.calls.push("release".to_string());
    }
}

pub(crate) fn episode(n: usize) -> Episode {
    Episode::new(
        format!("Episode {}", n),
        String::new(),
        Url::parse(&format!("https://cdn.example.com/{}.mp3", n)).unwrap(),
        "Show".to_string(),
        None,
    )
}

pub(crate) fn feed_of(count: usize) -> Feed {
    Feed::with_episodes(
        "Show".to_string(),
        PodcastURL::new("https://example.com/feed.xml"),
        (0..count).map(episode).collect(),
    )
}
