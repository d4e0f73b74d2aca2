// src/playback/state.rs
use crate::podcast::{Episode, FeedID};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// The episode is selected and the engine is opening it.
    Loading,
    Playing,
    Paused,
    /// Transient: the controller moves on to the next episode straight away.
    Ended,
}

/// What the presentation layer sees. Published as a whole after each operation,
/// never half-updated.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub feed_id: Option<FeedID>,
    pub feed_name: Option<String>,
    pub episode: Option<Episode>,
    pub is_playing: bool,
    pub progress: f64,
}
