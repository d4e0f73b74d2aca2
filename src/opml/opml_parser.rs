use log::warn;
use opml::{OPML, Outline};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpmlParseError {
    #[error("Failed to read OPML file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse OPML data: {0}")]
    OpmlFormatError(#[from] opml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlFeedEntry {
    pub title: String,
    pub xml_url: String, // This is typically the feed URL
}

/// Parses OPML content directly from a string.
///
/// Outlines of type "rss", or any outline carrying an `xmlUrl`, are treated as
/// feeds. Groups are walked recursively. A feed outline missing its `xmlUrl`
/// or any usable title is skipped with a warning rather than failing the import.
///
/// ```text
/// <opml version="2.0">
///     <body>
///         <outline type="rss" text="99% Invisible" xmlUrl="https://feeds.simplecast.com/BqbsxVfO"/>
///     </body>
/// </opml>
/// ```
pub fn parse_opml_from_string(opml_content: &str) -> Result<Vec<OpmlFeedEntry>, OpmlParseError> {
    let document = OPML::from_str(opml_content)?;
    let mut feed_entries = Vec::new();

    for outline in document.body.outlines {
        process_outline_recursive(outline, &mut feed_entries);
    }
    Ok(feed_entries)
}

pub fn parse_opml_from_file<P: AsRef<Path>>(
    file_path: P,
) -> Result<Vec<OpmlFeedEntry>, OpmlParseError> {
    let opml_content = fs::read_to_string(file_path)?;
    parse_opml_from_string(&opml_content)
}

fn process_outline_recursive(outline: Outline, feed_entries: &mut Vec<OpmlFeedEntry>) {
    let is_feed = outline.r#type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("rss"))
        || outline.xml_url.is_some();

    if is_feed {
        // Prefer the title attribute, fall back to text.
        let title = outline
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| (!outline.text.trim().is_empty()).then(|| outline.text.clone()));
        let xml_url = outline.xml_url.filter(|s| !s.trim().is_empty());

        match (title, xml_url) {
            (Some(title), Some(xml_url)) => {
                feed_entries.push(OpmlFeedEntry { title, xml_url })
            }
            (None, _) => warn!("OPML: skipping feed outline without a title"),
            (Some(title), None) => warn!("OPML: skipping feed outline '{}' without xmlUrl", title),
        }
    }

    // Groups can nest feeds at any depth
    for child_outline in outline.outlines {
        process_outline_recursive(child_outline, feed_entries);
    }
}
