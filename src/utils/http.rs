// src/utils/http.rs

//! HTTP fetch layer.
//!
//! `Fetcher` is the seam the crawl pipeline talks to; `HttpSession` is the
//! reqwest-backed implementation. Status and transport failures are kept
//! apart (`AppError::Http` vs `AppError::Connection`) so callers can recover
//! differently.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{Instrument, Span, debug, warn};

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, HeaderProfile};

/// A raw response from a successful (2xx) fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues GET requests with a caller-chosen header profile.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, profile: &HeaderProfile) -> Result<FetchResponse>;
}

/// Create a configured asynchronous HTTP client.
///
/// Cookies set by a source persist for the lifetime of the client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()
        .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))
}

/// reqwest-backed fetch session.
#[derive(Clone)]
pub struct HttpSession {
    client: Client,
    span: Span,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            span: tracing::info_span!("fetch"),
        }
    }

    /// Build a session with its own client from crawler settings.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    /// Attach the logging span fetch events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[async_trait]
impl Fetcher for HttpSession {
    async fn fetch(&self, url: &str, profile: &HeaderProfile) -> Result<FetchResponse> {
        async move {
            debug!("GET {}", url);

            let mut request = self.client.get(url);
            for (name, value) in profile.iter() {
                request = request.header(name, value);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::connection(url, e))?;

            let status = response.status();
            let headers: BTreeMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            if !status.is_success() {
                warn!("GET {} returned {}; response headers: {:?}", url, status, headers);
                return Err(AppError::http(url, status.as_u16()));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| AppError::connection(url, e))?;

            debug!("GET {} OK ({} bytes)", url, body.len());
            Ok(FetchResponse {
                status: status.as_u16(),
                headers,
                body: body.to_vec(),
            })
        }
        .instrument(self.span.clone())
        .await
    }
}
