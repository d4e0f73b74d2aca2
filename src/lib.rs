// src/lib.rs
pub mod config;
pub mod errors;
pub mod feed_parser;
pub mod feed_store;
pub mod logging;
pub mod opml;
pub mod playback;
pub mod podcast;
pub mod podcast_download;
