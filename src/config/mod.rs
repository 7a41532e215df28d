//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_POSTS_DIR: &str = "posts";
const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_METADATA_MARKER: &str = "@@";
const DEFAULT_UTC_OFFSET_HOURS: i8 = -5;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 50;
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 1800;
const DEFAULT_RSS_MAX_AGE_SECS: u64 = 3600;
const DEFAULT_POSTS_PER_PAGE: usize = 10;
const DEFAULT_RSS_ITEM_LIMIT: usize = 10;
const DEFAULT_SITE_URL: &str = "http://localhost:5000/";
const DEFAULT_FEED_TITLE: &str = "A brezza site";
const DEFAULT_FEED_AUTHOR: &str = "editor@example.com";

/// Command-line arguments for the brezza binary.
#[derive(Debug, Parser)]
#[command(name = "brezza", version, about = "Brezza blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BREZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the posts directory.
    #[arg(long = "posts-dir", value_name = "PATH")]
    pub posts_dir: Option<PathBuf>,

    /// Override the templates directory.
    #[arg(long = "templates-dir", value_name = "PATH")]
    pub templates_dir: Option<PathBuf>,

    /// Override the cache capacity.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,

    /// Override the wholesale cache flush interval.
    #[arg(long = "cache-flush-interval-seconds", value_name = "SECONDS")]
    pub cache_flush_interval_seconds: Option<u64>,

    /// Override the article count threshold per home page.
    #[arg(long = "feed-posts-per-page", value_name = "COUNT")]
    pub feed_posts_per_page: Option<usize>,

    /// Override the public site URL used in feed links.
    #[arg(long = "feed-site-url", value_name = "URL")]
    pub feed_site_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub cache: CacheSettings,
    pub feed: FeedSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub posts_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub metadata_marker: String,
    /// Offset at which declared post dates are interpreted when the feed
    /// needs absolute timestamps.
    pub utc_offset: UtcOffset,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_entries: NonZeroUsize,
    pub flush_interval: Duration,
    pub rss_max_age: Duration,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub posts_per_page: NonZeroUsize,
    pub rss_item_limit: usize,
    pub site_url: Url,
    pub author: String,
    pub title_fallback: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BREZZA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    cache: RawCacheSettings,
    feed: RawFeedSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(dir) = overrides.posts_dir.as_ref() {
            self.content.posts_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.templates_dir.as_ref() {
            self.content.templates_dir = Some(dir.clone());
        }
        if let Some(max) = overrides.cache_max_entries {
            self.cache.max_entries = Some(max);
        }
        if let Some(interval) = overrides.cache_flush_interval_seconds {
            self.cache.flush_interval_seconds = Some(interval);
        }
        if let Some(per_page) = overrides.feed_posts_per_page {
            self.feed.posts_per_page = Some(per_page);
        }
        if let Some(url) = overrides.feed_site_url.as_ref() {
            self.feed.site_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            cache,
            feed,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content: build_content_settings(content)?,
            cache: build_cache_settings(cache)?,
            feed: build_feed_settings(feed)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let candidate = format!("{host}:{port}");
    let addr = candidate
        .parse()
        .map_err(|err| LoadError::invalid("server.addr", format!("invalid address `{candidate}`: {err}")))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let posts_dir = content
        .posts_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_POSTS_DIR));
    if posts_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.posts_dir",
            "path must not be empty",
        ));
    }

    let templates_dir = content
        .templates_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
    if templates_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.templates_dir",
            "path must not be empty",
        ));
    }

    let metadata_marker = content
        .metadata_marker
        .unwrap_or_else(|| DEFAULT_METADATA_MARKER.to_string());
    if metadata_marker.trim().is_empty() {
        return Err(LoadError::invalid(
            "content.metadata_marker",
            "marker must not be empty",
        ));
    }

    let offset_hours = content.utc_offset_hours.unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
    let utc_offset = UtcOffset::from_hms(offset_hours, 0, 0).map_err(|err| {
        LoadError::invalid("content.utc_offset_hours", format!("out of range: {err}"))
    })?;

    Ok(ContentSettings {
        posts_dir,
        templates_dir,
        metadata_marker,
        utc_offset,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let max_entries_value = cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES);
    let max_entries = NonZeroUsize::new(max_entries_value)
        .ok_or_else(|| LoadError::invalid("cache.max_entries", "must be greater than zero"))?;

    let flush_seconds = cache
        .flush_interval_seconds
        .unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS);
    if flush_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.flush_interval_seconds",
            "must be greater than zero",
        ));
    }

    let rss_max_age_seconds = cache.rss_max_age_seconds.unwrap_or(DEFAULT_RSS_MAX_AGE_SECS);

    Ok(CacheSettings {
        max_entries,
        flush_interval: Duration::from_secs(flush_seconds),
        rss_max_age: Duration::from_secs(rss_max_age_seconds),
    })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let per_page_value = feed.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE);
    let posts_per_page = NonZeroUsize::new(per_page_value)
        .ok_or_else(|| LoadError::invalid("feed.posts_per_page", "must be greater than zero"))?;

    let rss_item_limit = feed.rss_item_limit.unwrap_or(DEFAULT_RSS_ITEM_LIMIT);

    let site_url_value = feed
        .site_url
        .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    let site_url = Url::parse(&site_url_value)
        .map_err(|err| LoadError::invalid("feed.site_url", format!("invalid url: {err}")))?;

    let author = feed
        .author
        .unwrap_or_else(|| DEFAULT_FEED_AUTHOR.to_string());
    let title_fallback = feed
        .title_fallback
        .unwrap_or_else(|| DEFAULT_FEED_TITLE.to_string());

    Ok(FeedSettings {
        posts_per_page,
        rss_item_limit,
        site_url,
        author,
        title_fallback,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    posts_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    metadata_marker: Option<String>,
    utc_offset_hours: Option<i8>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    max_entries: Option<usize>,
    flush_interval_seconds: Option<u64>,
    rss_max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    posts_per_page: Option<usize>,
    rss_item_limit: Option<usize>,
    site_url: Option<String>,
    author: Option<String>,
    title_fallback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_shape() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.cache.max_entries.get(), DEFAULT_CACHE_MAX_ENTRIES);
        assert_eq!(
            settings.cache.flush_interval,
            Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS)
        );
        assert_eq!(settings.feed.posts_per_page.get(), DEFAULT_POSTS_PER_PAGE);
        assert_eq!(settings.content.metadata_marker, DEFAULT_METADATA_MARKER);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = Overrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = Overrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.max_entries = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero capacity rejected");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.max_entries",
                ..
            }
        ));
    }

    #[test]
    fn empty_marker_is_rejected() {
        let mut raw = RawSettings::default();
        raw.content.metadata_marker = Some("   ".to_string());

        let err = Settings::from_raw(raw).expect_err("empty marker rejected");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "content.metadata_marker",
                ..
            }
        ));
    }

    #[test]
    fn invalid_site_url_is_rejected() {
        let mut raw = RawSettings::default();
        raw.feed.site_url = Some("not a url".to_string());

        let err = Settings::from_raw(raw).expect_err("bad url rejected");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "feed.site_url",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_utc_offset_is_rejected() {
        let mut raw = RawSettings::default();
        raw.content.utc_offset_hours = Some(27);

        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn parse_cli_overrides() {
        let args = CliArgs::parse_from([
            "brezza",
            "--server-host",
            "0.0.0.0",
            "--posts-dir",
            "/srv/posts",
            "--cache-max-entries",
            "25",
        ]);

        assert_eq!(args.overrides.server_host.as_deref(), Some("0.0.0.0"));
        assert_eq!(
            args.overrides.posts_dir.as_deref(),
            Some(std::path::Path::new("/srv/posts"))
        );
        assert_eq!(args.overrides.cache_max_entries, Some(25));
    }
}
