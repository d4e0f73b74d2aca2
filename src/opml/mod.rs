pub mod opml_parser;
