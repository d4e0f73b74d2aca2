// src/feed_parser.rs
use crate::errors::ParseError;
use crate::podcast::Episode;
use log::{debug, trace};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Decoder, Reader};
use url::Url;

/// Everything a single pass over a feed document yields.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub artwork_url: Option<Url>,
    pub episodes: Vec<Episode>,
}

/// Streaming RSS reader.
///
/// Holds configuration only; each `parse` call starts from a blank slate.
#[derive(Debug, Clone)]
pub struct FeedParser {
    podcast_name: String,
    episode_limit: Option<usize>,
    base_url: Option<Url>,
}

#[derive(Debug, Default)]
struct EpisodeDraft {
    title: String,
    description: String,
    enclosure_url: Option<String>,
    artwork_url: Option<String>,
}

/// Parses `raw` as an absolute URL, or relative to `base` when one is known.
/// Blank input never resolves, even against a base.
fn resolve_url(raw: &str, base: Option<&Url>) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Url::options().base_url(base).parse(raw).ok()
}

impl EpisodeDraft {
    /// Builds the episode, or `None` when the enclosure URL is missing or does
    /// not resolve. Relative enclosures are kept only when the parser knows the
    /// feed's own URL to resolve them against.
    fn finalize(self, podcast_name: &str, channel_artwork: Option<&Url>, base: Option<&Url>) -> Option<Episode> {
        let raw_url = self.enclosure_url?;
        let Some(audio_url) = resolve_url(&raw_url, base) else {
            debug!("Dropping item '{}': unusable enclosure url {:?}", self.title.trim(), raw_url);
            return None;
        };
        let artwork_url = self
            .artwork_url
            .and_then(|raw| resolve_url(&raw, base))
            .or_else(|| channel_artwork.cloned());

        Some(Episode::new(
            self.title.trim().to_string(),
            self.description.trim().to_string(),
            audio_url,
            podcast_name.to_string(),
            artwork_url,
        ))
    }
}

/// Mutable cursor state for one pass. Memory is bounded by the current item,
/// not by document depth.
#[derive(Default)]
struct ParseState {
    current_element: String,
    depth: usize,
    draft: Option<EpisodeDraft>,
    in_channel_image: bool,
    channel_title: String,
    channel_title_done: bool,
    channel_image_url: String,
    channel_artwork: Option<Url>,
}

impl ParseState {
    fn push_text(&mut self, text: &str) {
        match &mut self.draft {
            Some(draft) => match self.current_element.as_str() {
                "title" => draft.title.push_str(text),
                "description" => draft.description.push_str(text),
                _ => {}
            },
            None => match self.current_element.as_str() {
                "title" if !self.channel_title_done && !self.in_channel_image => {
                    self.channel_title.push_str(text)
                }
                "url" if self.in_channel_image => self.channel_image_url.push_str(text),
                _ => {}
            },
        }
    }

    fn open_element(&mut self, element: &BytesStart<'_>) -> Result<(), ParseError> {
        let name = element.decoder().decode(element.name().as_ref())?.into_owned();
        match name.as_str() {
            "item" => self.draft = Some(EpisodeDraft::default()),
            "image" if self.draft.is_none() => self.in_channel_image = true,
            "enclosure" => {
                if let Some(draft) = &mut self.draft {
                    draft.enclosure_url = attribute(element, b"url");
                }
            }
            "itunes:image" => {
                let href = attribute(element, b"href");
                match &mut self.draft {
                    Some(draft) => draft.artwork_url = href,
                    None => {
                        if self.channel_artwork.is_none() {
                            self.channel_artwork = href.and_then(|raw| Url::parse(raw.trim()).ok());
                        }
                    }
                }
            }
            _ => {}
        }
        self.current_element = name;
        Ok(())
    }

    fn close_element(&mut self, name: &[u8]) -> Option<EpisodeDraft> {
        match name {
            b"item" => return self.draft.take(),
            b"title" if self.draft.is_none() && !self.in_channel_image => {
                if !self.channel_title.trim().is_empty() {
                    self.channel_title_done = true;
                }
            }
            b"image" if self.draft.is_none() && self.in_channel_image => {
                self.in_channel_image = false;
                if self.channel_artwork.is_none() {
                    self.channel_artwork = Url::parse(self.channel_image_url.trim()).ok();
                }
            }
            _ => {}
        }
        None
    }
}

/// Decoded value of `key`. Undecodable values count as absent; unknown
/// entities are left as written.
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    let attr = element.attributes().flatten().find(|attr| attr.key.as_ref() == key)?;
    let raw = decode_lossless(element.decoder(), &attr.value)?;
    match unescape(&raw) {
        Ok(value) => Some(value.into_owned()),
        Err(_) => Some(raw),
    }
}

fn decode_lossless(decoder: Decoder, bytes: &[u8]) -> Option<String> {
    match decoder.decode(bytes) {
        Ok(text) => Some(text.into_owned()),
        Err(e) => {
            debug!("FeedParser: undecodable attribute value: {}", e);
            None
        }
    }
}

/// Resolves `&name;` content: predefined XML entities and numeric character
/// references. Anything else is kept verbatim.
fn resolve_reference(name: &str) -> String {
    if let Some(value) = resolve_predefined_entity(name) {
        return value.to_string();
    }
    let code_point = match name.strip_prefix('#') {
        Some(hex) if hex.starts_with('x') || hex.starts_with('X') => u32::from_str_radix(&hex[1..], 16).ok(),
        Some(dec) => dec.parse::<u32>().ok(),
        None => None,
    };
    match code_point.and_then(char::from_u32) {
        Some(c) => c.to_string(),
        None => format!("&{};", name),
    }
}

impl FeedParser {
    pub fn new(podcast_name: impl Into<String>) -> Self {
        Self { podcast_name: podcast_name.into(), episode_limit: None, base_url: None }
    }

    // Builder methods
    pub fn with_episode_limit(mut self, limit: usize) -> Self {
        self.episode_limit = Some(limit);
        self
    }

    /// The feed's own URL, used to resolve relative enclosure and artwork links.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn podcast_name(&self) -> &str {
        &self.podcast_name
    }

    /// Extracts episodes in the order their `item` elements close.
    ///
    /// Text is decoded with the encoding named in the XML declaration (UTF-8
    /// when there is none). Items without a usable `enclosure url` are skipped;
    /// only markup the tokenizer cannot get past, or bytes that do not decode,
    /// fail the whole call.
    pub fn parse(&self, bytes: &[u8]) -> Result<Vec<Episode>, ParseError> {
        self.parse_document(bytes).map(|parsed| parsed.episodes)
    }

    pub fn parse_document(&self, bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut state = ParseState::default();
        let mut episodes = Vec::new();
        let mut dropped = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    state.depth += 1;
                    state.open_element(&e)?;
                }
                Event::Empty(e) => {
                    state.open_element(&e)?;
                    if let Some(draft) = state.close_element(e.name().as_ref()) {
                        self.collect(draft, &state, &mut episodes, &mut dropped);
                    }
                }
                Event::End(e) => {
                    state.depth = state.depth.saturating_sub(1);
                    if let Some(draft) = state.close_element(e.name().as_ref()) {
                        self.collect(draft, &state, &mut episodes, &mut dropped);
                    }
                }
                Event::Text(e) => state.push_text(&e.decode()?),
                Event::CData(e) => state.push_text(&e.decode()?),
                Event::GeneralRef(e) => state.push_text(&resolve_reference(&e.decode()?)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if state.depth > 0 {
            return Err(ParseError::Truncated { open_elements: state.depth });
        }

        debug!(
            "FeedParser: '{}' yielded {} episode(s), dropped {} item(s)",
            self.podcast_name,
            episodes.len(),
            dropped
        );

        let title = state.channel_title.trim();
        Ok(ParsedFeed {
            title: (!title.is_empty()).then(|| title.to_string()),
            artwork_url: state.channel_artwork,
            episodes,
        })
    }

    fn collect(&self, draft: EpisodeDraft, state: &ParseState, episodes: &mut Vec<Episode>, dropped: &mut usize) {
        if self.episode_limit.is_some_and(|limit| episodes.len() >= limit) {
            trace!("FeedParser: episode limit reached, skipping item");
            return;
        }
        match draft.finalize(&self.podcast_name, state.channel_artwork.as_ref(), self.base_url.as_ref()) {
            Some(episode) => episodes.push(episode),
            None => *dropped += 1,
        }
    }
}
