// src/playback/events.rs
use crate::errors::PlaybackError;
use crate::podcast::{Episode, Feed};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Identifies one engine session; events carrying an outdated id are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Tick,
    ReachedEnd,
}

/// Audio-session interruption as delivered by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
    /// Anything the platform reports that is neither a begin nor an end.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Play,
    Pause,
    NextTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Success,
    CommandFailed,
}

#[derive(Debug)]
pub(crate) enum Command {
    Play { episode: Episode, feed: Feed },
    TogglePlayPause,
    SkipToNext,
    Seek(f64),
    Stop,
    UpdateFeed(Feed),
    Shutdown,
}

/// Everything that may mutate controller state, funnelled through one queue.
#[derive(Debug)]
pub(crate) enum ControllerEvent {
    Engine { session: SessionId, event: EngineEvent },
    Interruption(Interruption),
    Remote { command: RemoteCommand, reply: Option<oneshot::Sender<CommandStatus>> },
    Command { command: Command, reply: oneshot::Sender<Result<(), PlaybackError>> },
}
