// src/podcast.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

// === FEED STRUCTURES ===
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastURL(String);

impl std::fmt::Display for PodcastURL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for PodcastURL {
    fn eq(&self, other: &Self) -> bool {
        // Normalize URLs by trimming trailing slashes
        let a = self.0.trim_end_matches('/');
        let b = other.0.trim_end_matches('/');
        a == b
    }
}

impl Eq for PodcastURL {}

impl PodcastURL {
    pub fn new(s: &str) -> Self {
        PodcastURL(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PodcastURL {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedID(Uuid);

impl FeedID {
    pub fn generate() -> Self {
        FeedID(Uuid::new_v4())
    }
}

impl std::fmt::Display for FeedID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// === EPISODE STRUCTURES ===
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeID(Uuid);

impl EpisodeID {
    pub fn generate() -> Self {
        EpisodeID(Uuid::new_v4())
    }
}

impl std::fmt::Display for EpisodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscribed feed. Its episode list is only ever replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    id: FeedID,
    name: String,
    url: PodcastURL,
    episodes: Vec<Episode>,
    last_updated: Option<DateTime<Utc>>,
}

/// One playable item. Immutable once built; identity is minted at parse time,
/// so re-parsing the same document yields new ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    id: EpisodeID,
    title: String,
    description: String,
    audio_url: Url,
    podcast_name: String,
    artwork_url: Option<Url>,
}

impl Feed {
    pub fn new(name: String, url: PodcastURL) -> Self {
        Self::with_episodes(name, url, Vec::new())
    }

    pub fn with_episodes(name: String, url: PodcastURL, episodes: Vec<Episode>) -> Self {
        Self { id: FeedID::generate(), name, url, episodes, last_updated: None }
    }

    // Accessor methods

    pub fn id(&self) -> FeedID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &PodcastURL {
        &self.url
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub(crate) fn replace_episodes(&mut self, episodes: Vec<Episode>) {
        self.episodes = episodes;
        self.last_updated = Some(Utc::now());
    }
}

impl Episode {
    pub fn new(
        title: String,
        description: String,
        audio_url: Url,
        podcast_name: String,
        artwork_url: Option<Url>,
    ) -> Self {
        Self { id: EpisodeID::generate(), title, description, audio_url, podcast_name, artwork_url }
    }

    pub fn id(&self) -> EpisodeID {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Show notes rendered from HTML to wrapped plain text.
    pub fn description_text(&self, width: usize) -> String {
        match html2text::from_read(self.description.as_bytes(), width) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                log::debug!("Episode {}: description is not renderable HTML: {}", self.id, e);
                self.description.clone()
            }
        }
    }

    pub fn audio_url(&self) -> &Url {
        &self.audio_url
    }

    pub fn podcast_name(&self) -> &str {
        &self.podcast_name
    }

    pub fn artwork_url(&self) -> Option<&Url> {
        self.artwork_url.as_ref()
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name        : {}", self.name)?;
        writeln!(f, "URL         : {}", self.url)?;
        writeln!(f, "Episodes    : {}", self.episodes.len())?;
        match self.last_updated {
            Some(at) => writeln!(f, "Last updated: {}", at),
            None => writeln!(f, "Last updated: never"),
        }
    }
}
