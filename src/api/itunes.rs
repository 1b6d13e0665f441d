use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Client, Url, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::feed::{ChartFeed, LookupResponse};
use crate::api::normalize::{ChartKind, Normalizer};
use crate::config::AppConfig;
use crate::models::{Album, Record, Track};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("feed returned HTTP status {0}")]
    Status(u16),
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("invalid request url: {0}")]
    Url(String),
}

/// Per-call overrides; unset fields fall back to the configured storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub country: Option<String>,
    pub limit: Option<u32>,
}

/// Read-only gateway to the chart and lookup feeds.
#[derive(Clone)]
pub struct ItunesClient {
    http: Client,
    normalizer: Normalizer,
    chart_base_url: String,
    lookup_url: String,
    country: String,
    limit: u32,
    timeout: Duration,
}

impl ItunesClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "X-Client-Id",
            header::HeaderValue::from_str(config.client_id())
                .context("invalid client identifier header value")?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10).min(config.request_timeout()))
            .build()
            .context("unable to construct http client")?;

        Ok(Self {
            http,
            normalizer: Normalizer::new(config.artwork_size()),
            chart_base_url: config.chart_base_url().to_string(),
            lookup_url: config.lookup_url().to_string(),
            country: config.country().to_string(),
            limit: config.limit(),
            timeout: config.request_timeout(),
        })
    }

    pub async fn fetch_top_tracks(&self, options: &FetchOptions) -> Result<Vec<Track>, FetchError> {
        let records = self.fetch_chart(ChartKind::Songs, options).await?;
        Ok(records.into_iter().filter_map(Record::into_track).collect())
    }

    pub async fn fetch_top_albums(&self, options: &FetchOptions) -> Result<Vec<Album>, FetchError> {
        let records = self.fetch_chart(ChartKind::Albums, options).await?;
        Ok(records.into_iter().filter_map(Record::into_album).collect())
    }

    pub async fn fetch_album_tracks(
        &self,
        album_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Track>, FetchError> {
        let url = self.lookup_request_url(album_id, options)?;
        let body: LookupResponse = self.get_json(url).await?;
        let tracks = self.normalizer.normalize_lookup_results(body);
        info!(album_id, count = tracks.len(), "album tracks fetched");
        Ok(tracks)
    }

    async fn fetch_chart(
        &self,
        kind: ChartKind,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, FetchError> {
        let url = self.chart_request_url(kind, options)?;
        let body: ChartFeed = self.get_json(url).await?;
        let records = self.normalizer.normalize_chart_feed(kind, body);
        info!(chart = kind.path_segment(), count = records.len(), "chart fetched");
        Ok(records)
    }

    fn chart_request_url(&self, kind: ChartKind, options: &FetchOptions) -> Result<Url, FetchError> {
        let country = options.country.as_deref().unwrap_or(&self.country);
        let limit = options.limit.unwrap_or(self.limit);
        Url::parse_with_params(
            &format!(
                "{}/{country}/rss/{}/limit={limit}/json",
                self.chart_base_url,
                kind.path_segment()
            ),
            [("_", cache_buster())],
        )
        .map_err(|err| FetchError::Url(err.to_string()))
    }

    fn lookup_request_url(&self, album_id: &str, options: &FetchOptions) -> Result<Url, FetchError> {
        let country = options.country.as_deref().unwrap_or(&self.country);
        Url::parse_with_params(
            &self.lookup_url,
            [
                ("id", album_id),
                ("entity", "song"),
                ("country", country),
                ("_", cache_buster().as_str()),
            ],
        )
        .map_err(|err| FetchError::Url(err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!(%url, "requesting feed");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|err| self.classify(err))?;
        serde_json::from_slice(&bytes).map_err(|err| FetchError::Parse(err.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout.as_secs() + u64::from(self.timeout.subsec_nanos() > 0),
            }
        } else {
            FetchError::Network(err)
        }
    }
}

fn cache_buster() -> String {
    Utc::now().timestamp_millis().to_string()
}
