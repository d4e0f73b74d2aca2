// src/feed_store.rs
use crate::config::ClientConfig;
use crate::errors::PodcastError;
use crate::feed_parser::FeedParser;
use crate::opml::opml_parser::{OpmlFeedEntry, parse_opml_from_file, parse_opml_from_string};
use crate::podcast::{Episode, Feed, FeedID, PodcastURL};
use crate::podcast_download::{FeedFetcher, download_and_parse_feed};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Subscribed feeds and their most recently fetched episode lists.
pub struct FeedStore {
    feeds: Vec<Feed>,
    fetcher: Arc<dyn FeedFetcher + Send + Sync>,
    episode_limit: Option<usize>,
}

fn validate_feed_url(url_str: &str) -> Result<Url, PodcastError> {
    let parsed_url = Url::parse(url_str)
        .map_err(|e| PodcastError::InvalidUrl(format!("Invalid URL format for '{}': {}", url_str, e)))?;

    if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
        return Err(PodcastError::InvalidUrl(format!(
            "Invalid URL scheme for '{}': '{}'. Only http/https supported.",
            url_str,
            parsed_url.scheme()
        )));
    }
    Ok(parsed_url)
}

impl FeedStore {
    pub fn new(fetcher: Arc<dyn FeedFetcher + Send + Sync>, config: &ClientConfig) -> Self {
        Self { feeds: Vec::new(), fetcher, episode_limit: config.episode_limit }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn feed(&self, id: FeedID) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id() == id)
    }

    pub fn add_feed(&mut self, name: &str, url: &str) -> Result<FeedID, PodcastError> {
        let url = validate_feed_url(url)?;
        let feed = Feed::new(name.to_string(), PodcastURL::new(url.as_str()));
        let id = feed.id();
        info!("FeedStore: subscribed to '{}' ({})", name, url);
        self.feeds.push(feed);
        Ok(id)
    }

    pub fn remove_feed(&mut self, id: FeedID) -> Option<Feed> {
        let index = self.feeds.iter().position(|f| f.id() == id)?;
        Some(self.feeds.remove(index))
    }

    /// Adds every feed outline of an OPML document, skipping invalid URLs and
    /// feeds already subscribed.
    pub fn import_opml(&mut self, opml_content: &str) -> Result<Vec<FeedID>, PodcastError> {
        let entries = parse_opml_from_string(opml_content)?;
        Ok(self.add_opml_entries(entries))
    }

    pub fn import_opml_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<FeedID>, PodcastError> {
        let path = path.as_ref();
        info!("FeedStore: importing subscriptions from {}", path.display());
        let entries = parse_opml_from_file(path)?;
        Ok(self.add_opml_entries(entries))
    }

    fn add_opml_entries(&mut self, entries: Vec<OpmlFeedEntry>) -> Vec<FeedID> {
        let mut added = Vec::new();
        for entry in entries {
            let candidate = PodcastURL::new(&entry.xml_url);
            if self.feeds.iter().any(|f| f.url() == &candidate) {
                info!("FeedStore: '{}' already subscribed, skipping", entry.title);
                continue;
            }
            match self.add_feed(&entry.title, &entry.xml_url) {
                Ok(id) => added.push(id),
                Err(e) => warn!("FeedStore: skipping OPML entry '{}': {}", entry.title, e),
            }
        }
        added
    }

    fn parser_for(&self, feed: &Feed) -> FeedParser {
        let mut parser = FeedParser::new(feed.name());
        if let Ok(base) = Url::parse(feed.url().as_str()) {
            parser = parser.with_base_url(base);
        }
        match self.episode_limit {
            Some(limit) => parser.with_episode_limit(limit),
            None => parser,
        }
    }

    /// Re-fetches one feed. On success its episode list is replaced wholesale;
    /// on failure the previous list is left untouched.
    pub async fn refresh(&mut self, id: FeedID) -> Result<usize, PodcastError> {
        let feed = self.feed(id).ok_or(PodcastError::UnknownFeed(id))?;
        let url = feed.url().clone();
        let parser = self.parser_for(feed);
        let outcome = download_and_parse_feed(&url, &parser, self.fetcher.as_ref())
            .await
            .map(|parsed| parsed.episodes);
        self.apply_refresh(id, outcome)
    }

    /// Fetches every feed concurrently. Each outcome is applied to its own feed
    /// as soon as that fetch completes, so a slow feed never holds back the
    /// others. Outcomes are returned in completion order.
    pub async fn refresh_all(&mut self) -> Vec<(FeedID, Result<usize, PodcastError>)> {
        let jobs: Vec<(FeedID, PodcastURL, FeedParser)> =
            self.feeds.iter().map(|f| (f.id(), f.url().clone(), self.parser_for(f))).collect();

        let mut in_flight: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|(id, url, parser)| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    let outcome =
                        download_and_parse_feed(&url, &parser, fetcher.as_ref()).await.map(|parsed| parsed.episodes);
                    (id, outcome)
                }
            })
            .collect();

        let mut results = Vec::new();
        while let Some((id, outcome)) = in_flight.next().await {
            results.push((id, self.apply_refresh(id, outcome)));
        }
        results
    }

    fn apply_refresh(
        &mut self,
        id: FeedID,
        outcome: Result<Vec<Episode>, PodcastError>,
    ) -> Result<usize, PodcastError> {
        // The feed may have been removed while the fetch was in flight.
        let feed = self.feeds.iter_mut().find(|f| f.id() == id).ok_or(PodcastError::UnknownFeed(id))?;
        match outcome {
            Ok(episodes) => {
                let count = episodes.len();
                feed.replace_episodes(episodes);
                info!("FeedStore: '{}' now has {} episode(s)", feed.name(), count);
                Ok(count)
            }
            Err(e) => {
                error!("FeedStore: refresh of '{}' failed, keeping {} cached episode(s): {}", feed.name(), feed.episodes().len(), e);
                Err(e)
            }
        }
    }
}
