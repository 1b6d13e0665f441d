use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;
use uuid::Uuid;

use crate::api::normalize::DEFAULT_ARTWORK_SIZE;

pub const DEFAULT_COUNTRY: &str = "th";
pub const DEFAULT_LIMIT: u32 = 24;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const MAX_LIMIT: u32 = 200;

const DEFAULT_CHART_BASE_URL: &str = "https://itunes.apple.com";
const DEFAULT_LOOKUP_URL: &str = "https://itunes.apple.com/lookup";
const DEFAULT_LOG_FILTER: &str = "chartdeck=info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("country code must be two ASCII letters, got '{0}'")]
    Country(String),
    #[error("row limit must be between 1 and {MAX_LIMIT}, got {0}")]
    Limit(u32),
    #[error("request timeout must be at least one second")]
    Timeout,
}

/// Command-line and environment overrides.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "chartdeck", version, about = "Browse the iTunes top charts from the terminal")]
pub struct CliArgs {
    /// Storefront country code used for charts and lookups
    #[arg(short, long, env = "CHARTDECK_COUNTRY")]
    pub country: Option<String>,

    /// Number of chart rows to request
    #[arg(short, long, env = "CHARTDECK_LIMIT")]
    pub limit: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "CHARTDECK_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Directory holding the favorites database, log file and saved artwork
    #[arg(long, env = "CHARTDECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// tracing filter directive, e.g. `chartdeck=debug`
    #[arg(long, env = "CHARTDECK_LOG")]
    pub log_filter: Option<String>,
}

/// Static configuration and filesystem paths used throughout the application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    data_dir: PathBuf,
    artwork_dir: PathBuf,
    db_path: PathBuf,
    log_path: PathBuf,
    log_filter: String,
    country: String,
    limit: u32,
    request_timeout: Duration,
    chart_base_url: String,
    lookup_url: String,
    artwork_size: u32,
    user_agent: String,
    client_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client_id = format!("chartdeck-{}", Uuid::new_v4());
        let user_agent = format!("chartdeck/{} ( unique-id={client_id} )", env!("CARGO_PKG_VERSION"));

        let mut config = Self {
            data_dir: PathBuf::new(),
            artwork_dir: PathBuf::new(),
            db_path: PathBuf::new(),
            log_path: PathBuf::new(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            limit: DEFAULT_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chart_base_url: DEFAULT_CHART_BASE_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            artwork_size: DEFAULT_ARTWORK_SIZE,
            user_agent,
            client_id,
        };
        config.set_data_dir(PathBuf::from("data"));
        config
    }
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = args.data_dir {
            config.set_data_dir(dir);
        }
        if let Some(country) = args.country {
            config.country = validate_country(&country)?;
        }
        if let Some(limit) = args.limit {
            if limit == 0 || limit > MAX_LIMIT {
                return Err(ConfigError::Limit(limit));
            }
            config.limit = limit;
        }
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                return Err(ConfigError::Timeout);
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(filter) = args.log_filter {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Points both feed endpoints at another host.
    pub fn with_base_urls(mut self, chart_base_url: &str, lookup_url: &str) -> Self {
        self.chart_base_url = chart_base_url.trim_end_matches('/').to_string();
        self.lookup_url = lookup_url.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn set_data_dir(&mut self, base: PathBuf) {
        self.artwork_dir = base.join("artwork");
        self.db_path = base.join("chartdeck.db");
        self.log_path = base.join("chartdeck.log");
        self.data_dir = base;
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn artwork_dir(&self) -> &Path {
        &self.artwork_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn chart_base_url(&self) -> &str {
        &self.chart_base_url
    }

    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }

    pub fn artwork_size(&self) -> u32 {
        self.artwork_size
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Ensures that the data and artwork directories exist.
    pub fn ensure_filesystem(&self) -> Result<()> {
        for path in [self.data_dir(), self.artwork_dir()] {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }
}

fn validate_country(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|ch| ch.is_ascii_alphabetic()) {
        Ok(code.to_ascii_lowercase())
    } else {
        Err(ConfigError::Country(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    /// Parses argv with every `env` fallback removed so the developer's shell
    /// cannot leak into the result.
    fn parse_argv(argv: &[&str]) -> anyhow::Result<CliArgs> {
        let matches = CliArgs::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(argv)?;
        Ok(CliArgs::from_arg_matches(&matches)?)
    }

    #[test]
    fn defaults_match_the_chart_storefront() {
        let config = AppConfig::default();
        assert_eq!(config.country(), "th");
        assert_eq!(config.limit(), 24);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.db_path(), Path::new("data/chartdeck.db"));
        assert_eq!(config.artwork_dir(), Path::new("data/artwork"));
        assert!(config.user_agent().contains(config.client_id()));
    }

    #[test]
    fn cli_overrides_are_applied() -> anyhow::Result<()> {
        let args = parse_argv(&[
            "chartdeck",
            "--country",
            "US",
            "--limit",
            "50",
            "--timeout-secs",
            "5",
            "--data-dir",
            "/tmp/chartdeck",
            "--log-filter",
            "chartdeck=trace",
        ])?;
        let config = AppConfig::from_args(args)?;

        assert_eq!(config.country(), "us");
        assert_eq!(config.limit(), 50);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_path(), Path::new("/tmp/chartdeck/chartdeck.log"));
        assert_eq!(config.log_filter(), "chartdeck=trace");
        Ok(())
    }

    #[test]
    fn bare_invocation_uses_defaults() -> anyhow::Result<()> {
        let config = AppConfig::from_args(parse_argv(&["chartdeck"])?)?;
        assert_eq!(config.country(), DEFAULT_COUNTRY);
        assert_eq!(config.limit(), DEFAULT_LIMIT);
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Ok(())
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let bad_country = CliArgs {
            country: Some("tha".into()),
            ..CliArgs::default()
        };
        assert_eq!(
            AppConfig::from_args(bad_country).err(),
            Some(ConfigError::Country("tha".into()))
        );

        let bad_limit = CliArgs {
            limit: Some(0),
            ..CliArgs::default()
        };
        assert_eq!(AppConfig::from_args(bad_limit).err(), Some(ConfigError::Limit(0)));

        let bad_timeout = CliArgs {
            timeout_secs: Some(0),
            ..CliArgs::default()
        };
        assert_eq!(AppConfig::from_args(bad_timeout).err(), Some(ConfigError::Timeout));
    }

    #[test]
    fn ensure_filesystem_creates_directories() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let config = AppConfig::from_args(CliArgs {
            data_dir: Some(tmp.path().join("state")),
            ..CliArgs::default()
        })?;
        config.ensure_filesystem()?;
        assert!(config.artwork_dir().is_dir());
        Ok(())
    }
}
