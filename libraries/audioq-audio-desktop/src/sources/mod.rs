//! Cue source implementations

pub mod local;
