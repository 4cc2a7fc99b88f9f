//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{BoxOfficeSelectors, DetailSelectors, ListingSelectors};
use crate::utils::parse_selector;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and politeness settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Now-playing listing source
    #[serde(default)]
    pub listing: ListingConfig,

    /// Detail page schema
    #[serde(default)]
    pub detail: DetailConfig,

    /// Box-office source
    #[serde(default)]
    pub box_office: BoxOfficeConfig,

    /// Seen-link filter tuning
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Persistent storage location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values and compile every selector once.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.min_delay_ms > self.crawler.max_delay_ms {
            return Err(AppError::validation(
                "crawler.min_delay_ms must not exceed crawler.max_delay_ms",
            ));
        }
        let rate = self.dedup.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(AppError::validation(
                "dedup.false_positive_rate must be in (0, 1)",
            ));
        }
        if !(self.dedup.tightening_ratio > 0.0 && self.dedup.tightening_ratio < 1.0) {
            return Err(AppError::validation(
                "dedup.tightening_ratio must be in (0, 1)",
            ));
        }
        if self.dedup.initial_capacity == 0 || self.dedup.growth_factor < 2 {
            return Err(AppError::validation(
                "dedup.initial_capacity must be > 0 and dedup.growth_factor >= 2",
            ));
        }

        url::Url::parse(&self.listing.url())?;
        if self.box_office.enabled {
            url::Url::parse(&self.box_office.url)?;
        }

        let listing = &self.listing.selectors;
        let detail = &self.detail.selectors;
        let board = &self.box_office.selectors;
        for selector in [
            &listing.item_selector,
            &listing.link_selector,
            &detail.release_date,
            &detail.summary,
            &detail.comments,
            &board.font_style,
            &board.movie_name,
            &board.box_office,
            &board.release_days,
            &board.schedule_rate,
        ] {
            parse_selector(selector)?;
        }

        Ok(())
    }
}

/// HTTP client and politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Lower bound of the pause after each detail fetch
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the pause after each detail fetch
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Detail fetches in flight against the listing host
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// An ordered set of request headers chosen per request context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HeaderProfile {
    pub headers: BTreeMap<String, String>,
}

impl HeaderProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `name` set to `value`, replacing any previous value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The now-playing listing source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Listing URL; `{city}` is replaced with the lowercased city
    #[serde(default = "defaults::listing_url")]
    pub url_template: String,

    #[serde(default = "defaults::city")]
    pub city: String,

    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Headers sent with the listing request
    #[serde(default = "defaults::listing_headers")]
    pub headers: HeaderProfile,
}

impl ListingConfig {
    /// Concrete listing URL for the configured city.
    pub fn url(&self) -> String {
        self.url_template
            .replace("{city}", &self.city.to_lowercase())
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url_template: defaults::listing_url(),
            city: defaults::city(),
            selectors: ListingSelectors::default(),
            headers: defaults::listing_headers(),
        }
    }
}

/// Detail page schema and request headers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailConfig {
    #[serde(default)]
    pub selectors: DetailSelectors,

    /// Extra headers layered over the listing profile
    #[serde(default)]
    pub headers: HeaderProfile,
}

impl Config {
    /// Headers for the listing request.
    pub fn listing_profile(&self) -> HeaderProfile {
        self.listing.headers.clone()
    }

    /// Headers for detail requests: the listing profile referred from the listing page.
    pub fn detail_profile(&self) -> HeaderProfile {
        let mut profile = self
            .listing
            .headers
            .clone()
            .with_header("Referer", self.listing.url());
        for (name, value) in self.detail.headers.iter() {
            profile = profile.with_header(name, value);
        }
        profile
    }

    /// Headers for the box-office request.
    pub fn box_office_profile(&self) -> HeaderProfile {
        self.box_office.headers.clone()
    }
}

/// Box-office source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxOfficeConfig {
    /// Whether to enrich records with box-office figures
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::box_office_url")]
    pub url: String,

    #[serde(default)]
    pub selectors: BoxOfficeSelectors,

    /// Headers sent with the box-office request, cookie included
    #[serde(default = "defaults::box_office_headers")]
    pub headers: HeaderProfile,
}

impl Default for BoxOfficeConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            url: defaults::box_office_url(),
            selectors: BoxOfficeSelectors::default(),
            headers: defaults::box_office_headers(),
        }
    }
}

/// Scalable Bloom filter tuning.
///
/// A false positive permanently suppresses re-crawling that link until the
/// persistent store is purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Capacity of the first filter layer
    #[serde(default = "defaults::initial_capacity")]
    pub initial_capacity: usize,

    /// Target false positive rate of the whole filter
    #[serde(default = "defaults::false_positive_rate")]
    pub false_positive_rate: f64,

    /// Capacity multiplier for each new layer
    #[serde(default = "defaults::growth_factor")]
    pub growth_factor: usize,

    /// Error-rate multiplier for each new layer
    #[serde(default = "defaults::tightening_ratio")]
    pub tightening_ratio: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            initial_capacity: defaults::initial_capacity(),
            false_positive_rate: defaults::false_positive_rate(),
            growth_factor: defaults::growth_factor(),
            tightening_ratio: defaults::tightening_ratio(),
        }
    }
}

/// Persistent storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the seen store and run reports
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::HeaderProfile;

    const BROWSER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_0) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/62.0.3202.75 Safari/537.36";
    const ACCEPT: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

    // Crawler defaults
    pub fn user_agent() -> String {
        BROWSER_AGENT.into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn min_delay() -> u64 {
        2_000
    }
    pub fn max_delay() -> u64 {
        6_000
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Listing defaults
    pub fn listing_url() -> String {
        "https://movie.douban.com/cinema/nowplaying/{city}/".into()
    }
    pub fn city() -> String {
        "hefei".into()
    }
    pub fn listing_headers() -> HeaderProfile {
        HeaderProfile::new()
            .with_header("Accept", ACCEPT)
            .with_header("Accept-Language", "zh-CN,zh;q=0.9")
            .with_header("Cache-Control", "max-age=0")
            .with_header("Host", "movie.douban.com")
            .with_header("Referer", "https://movie.douban.com/")
            .with_header("Upgrade-Insecure-Requests", "1")
    }

    // Box-office defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn box_office_url() -> String {
        "http://piaofang.maoyan.com/?ver=normal".into()
    }
    pub fn box_office_headers() -> HeaderProfile {
        HeaderProfile::new()
            .with_header("Accept", ACCEPT)
            .with_header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
            .with_header("Cache-Control", "max-age=0")
            .with_header("Host", "piaofang.maoyan.com")
            .with_header("Referer", "http://piaofang.maoyan.com/dashboard")
            .with_header("Upgrade-Insecure-Requests", "1")
            .with_header("Cookie", "_lxsdk_s=b612e13fda305b2dadde4a6974ab%7C%7C2")
    }

    // Dedup defaults
    pub fn initial_capacity() -> usize {
        100
    }
    pub fn false_positive_rate() -> f64 {
        0.001
    }
    pub fn growth_factor() -> usize {
        2
    }
    pub fn tightening_ratio() -> f64 {
        0.9
    }

    // Storage defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = Config::default();
        config.crawler.min_delay_ms = 7_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_false_positive_rate() {
        let mut config = Config::default();
        config.dedup.false_positive_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_broken_selector() {
        let mut config = Config::default();
        config.detail.selectors.summary = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn listing_url_substitutes_city() {
        let mut config = Config::default();
        config.listing.city = "Beijing".to_string();
        assert_eq!(
            config.listing.url(),
            "https://movie.douban.com/cinema/nowplaying/beijing/"
        );
    }

    #[test]
    fn detail_profile_refers_to_listing() {
        let config = Config::default();
        let profile = config.detail_profile();
        assert_eq!(profile.get("referer"), Some(config.listing.url().as_str()));
        assert_eq!(profile.get("Host"), Some("movie.douban.com"));
        assert_eq!(config.listing_profile().get("Referer"), Some("https://movie.douban.com/"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            min_delay_ms = 0
            max_delay_ms = 0

            [box_office]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.max_delay_ms, 0);
        assert_eq!(config.crawler.timeout_secs, 30);
        assert!(!config.box_office.enabled);
        assert_eq!(config.listing.selectors.fields.name, "data-title");
    }
}
