//! Brezza: a calm, file-backed blog publishing engine.
//!
//! Markdown posts with marker-delimited metadata live under a dated
//! directory tree; brezza renders them through literal-substitution
//! templates, serves paginated listings and an RSS feed, and keeps rendered
//! output in a bounded in-memory cache that is flushed wholesale on a timer.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
