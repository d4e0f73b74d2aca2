// src/podcast_download.rs
use crate::config::ClientConfig;
use crate::errors::{FetchError, PodcastError};
use crate::feed_parser::{FeedParser, ParsedFeed};
use crate::podcast::PodcastURL;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};

// ===== fetcher
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Raw body of `url`. Non-2xx responses are failures.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

// ===== Live http fetcher
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_bytes: usize,
}

impl HttpFeedFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let client: Client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, max_feed_bytes: config.max_feed_bytes })
    }

    fn check_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
        if status.is_success() {
            return Ok(());
        }
        warn!("HttpFeedFetcher: {} answered {}", url, status);
        Err(FetchError::Status(status.as_u16()))
    }

    /// Applied to the advertised `Content-Length` before the body is read, and
    /// again to the body actually received.
    fn check_size(&self, size: usize) -> Result<(), FetchError> {
        if size > self.max_feed_bytes {
            return Err(FetchError::FeedTooLarge { size });
        }
        Ok(())
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!("HttpFeedFetcher: fetching {}", url);
        let response: Response = self.client.get(url).send().await?;
        Self::check_status(url, response.status())?;
        if let Some(length) = response.content_length() {
            self.check_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }
        let body = response.bytes().await?;
        self.check_size(body.len())?;
        debug!("HttpFeedFetcher: {} returned {} bytes", url, body.len());
        Ok(body.to_vec())
    }
}

// ===== Fake http fetcher for testing
#[cfg(test)]
pub(crate) struct FakeFetcher {
    pub responses: std::collections::HashMap<String, Result<String, u16>>,
}

#[cfg(test)]
impl FakeFetcher {
    pub fn single(url: &str, body: &str) -> Self {
        let mut responses = std::collections::HashMap::new();
        responses.insert(url.to_string(), Ok(body.to_string()));
        Self { responses }
    }
}

#[cfg(test)]
#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Failed(format!("no fake response for {}", url))),
        }
    }
}

/// Fetches a feed and runs it through `parser`.
pub async fn download_and_parse_feed(
    url: &PodcastURL,
    parser: &FeedParser,
    fetcher: &(dyn FeedFetcher + Send + Sync),
) -> Result<ParsedFeed, PodcastError> {
    info!("download_and_parse_feed: Fetching content for URL: {}", url.as_str());
    let content: Vec<u8> = fetcher.fetch(url.as_str()).await?;
    info!("download_and_parse_feed: Content fetched, length: {}", content.len());
    Ok(parser.parse_document(&content)?)
}
