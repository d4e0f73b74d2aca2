// src/playback/engine.rs
use crate::playback::events::{ControllerEvent, EngineEvent, SessionId};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to load {uri}: {reason}")]
    Load { uri: String, reason: String },
}

/// Token returned by an observer registration, handed back to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// Engine-side callback target.
///
/// Engines call this from whatever thread they like; it only enqueues an event
/// for the controller's own task, tagged with the session it was created for.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: UnboundedSender<ControllerEvent>,
}

impl EventSink {
    pub(crate) fn new(session: SessionId, tx: UnboundedSender<ControllerEvent>) -> Self {
        Self { session, tx }
    }

    /// Returns false once the controller is gone.
    pub fn tick(&self) -> bool {
        self.post(EngineEvent::Tick)
    }

    pub fn reached_end(&self) -> bool {
        self.post(EngineEvent::ReachedEnd)
    }

    fn post(&self, event: EngineEvent) -> bool {
        self.tx.send(ControllerEvent::Engine { session: self.session, event }).is_ok()
    }
}

/// Media decode/render backend. `load` produces one player handle per episode.
pub trait MediaEngine: Send {
    type Player: Player;

    fn load(&mut self, uri: &Url) -> Result<Self::Player, EngineError>;
}

/// A loaded media item. Dropping it releases the underlying engine resources.
pub trait Player: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    /// `None` while the engine cannot tell yet.
    fn current_time(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn on_periodic_tick(&mut self, interval: Duration, sink: EventSink) -> ObserverHandle;
    fn on_reached_end(&mut self, sink: EventSink) -> ObserverHandle;
    fn remove_observer(&mut self, handle: ObserverHandle);
}
