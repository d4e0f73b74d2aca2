// src/playback/handle.rs
use crate::errors::PlaybackError;
use crate::playback::events::{Command, CommandStatus, ControllerEvent, Interruption, RemoteCommand};
use crate::playback::state::PlaybackSnapshot;
use crate::podcast::{Episode, Feed};
use tokio::sync::{mpsc, oneshot, watch};

/// OS "now playing" surface: receives a target and forwards play/pause/next.
pub trait RemoteCommandSurface {
    fn register(&mut self, target: RemoteTarget);
}

/// OS audio-session notifications.
pub trait InterruptionSource {
    fn register(&mut self, sink: InterruptionSink);
}

#[derive(Debug, Clone)]
pub struct RemoteTarget {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl RemoteTarget {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { tx }
    }

    /// For surfaces that cannot await: the status arrives on the returned
    /// receiver once the controller has applied the command.
    pub fn dispatch(&self, command: RemoteCommand) -> oneshot::Receiver<CommandStatus> {
        let (reply, rx) = oneshot::channel();
        // A closed controller drops `reply`, which the receiver observes as an error.
        let _ = self.tx.send(ControllerEvent::Remote { command, reply: Some(reply) });
        rx
    }

    pub async fn execute(&self, command: RemoteCommand) -> CommandStatus {
        self.dispatch(command).await.unwrap_or(CommandStatus::CommandFailed)
    }
}

#[derive(Debug, Clone)]
pub struct InterruptionSink {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl InterruptionSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the controller is gone.
    pub fn notify(&self, interruption: Interruption) -> bool {
        self.tx.send(ControllerEvent::Interruption(interruption)).is_ok()
    }
}

/// Cloneable front door to a controller running on its own task.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
    state_rx: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<ControllerEvent>,
        state_rx: watch::Receiver<PlaybackSnapshot>,
    ) -> Self {
        Self { tx, state_rx }
    }

    async fn request(&self, command: Command) -> Result<(), PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControllerEvent::Command { command, reply })
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    pub async fn play(&self, episode: Episode, feed: Feed) -> Result<(), PlaybackError> {
        self.request(Command::Play { episode, feed }).await
    }

    pub async fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        self.request(Command::TogglePlayPause).await
    }

    pub async fn skip_to_next(&self) -> Result<(), PlaybackError> {
        self.request(Command::SkipToNext).await
    }

    pub async fn seek(&self, fraction: f64) -> Result<(), PlaybackError> {
        self.request(Command::Seek(fraction)).await
    }

    pub async fn stop(&self) -> Result<(), PlaybackError> {
        self.request(Command::Stop).await
    }

    pub async fn update_feed(&self, feed: Feed) -> Result<(), PlaybackError> {
        self.request(Command::UpdateFeed(feed)).await
    }

    /// Stops playback and ends [`PlaybackController::run`](super::PlaybackController::run).
    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        self.request(Command::Shutdown).await
    }

    pub async fn remote(&self, command: RemoteCommand) -> CommandStatus {
        RemoteTarget::new(self.tx.clone()).execute(command).await
    }

    pub fn interrupt(&self, interruption: Interruption) -> Result<(), PlaybackError> {
        if InterruptionSink::new(self.tx.clone()).notify(interruption) {
            Ok(())
        } else {
            Err(PlaybackError::ControllerClosed)
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state_rx.clone()
    }
}
