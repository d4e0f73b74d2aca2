// errors.rs
use crate::opml::opml_parser::OpmlParseError;
use crate::podcast::FeedID;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("Feed too large: {size} bytes")]
    FeedTooLarge { size: usize },

    #[error("Fetch failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed feed markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Feed text does not match its declared encoding: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("Feed ended with {open_elements} unclosed element(s)")]
    Truncated { open_elements: usize },
}

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Opml(#[from] OpmlParseError),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown feed: {0}")]
    UnknownFeed(FeedID),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No active playback session")]
    NoActiveSession,

    #[error("No feed selected")]
    NoFeedSelected,

    #[error("Selected feed has no episodes")]
    EmptyFeed,

    #[error("Engine failed to load episode: {0}")]
    EngineInitFailure(String),

    #[error("Playback controller is no longer running")]
    ControllerClosed,
}
