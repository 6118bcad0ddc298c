//! File-shape fixups that run before anything touches the database:
//! encoding normalization for card exports, scraped-text repair, and the
//! Tesco JSON flattener.

pub mod encoding;
pub mod scrub;
pub mod tesco;
