//! Shuffle playback: one engine session at a time, driven by user commands,
//! engine callbacks, remote commands and audio interruptions.

pub mod controller;
pub mod engine;
pub mod events;
pub mod handle;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::PlaybackController;
pub use engine::{EngineError, EventSink, MediaEngine, ObserverHandle, Player};
pub use events::{CommandStatus, Interruption, RemoteCommand, SessionId};
pub use handle::{InterruptionSink, InterruptionSource, PlaybackHandle, RemoteCommandSurface, RemoteTarget};
pub use state::{PlaybackPhase, PlaybackSnapshot};
