use crate::client::{ApiResponse, Endpoint, SentimentApi, TransportError};
use crate::config::Settings;
use crate::domain::sentiment::TransportMeta;
use anyhow::Context;
use reqwest::header::HeaderMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

const HEADER_CACHE: &str = "x-cache";
const HEADER_MODE: &str = "x-mode";
const HEADER_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HttpSentimentApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSentimentApi {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout_secs = std::env::var("PIONI_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(settings.api_base_url(), Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pioni/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build sentiment api http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait::async_trait]
impl SentimentApi for HttpSentimentApi {
    fn provider_name(&self) -> &'static str {
        "pioni_http"
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<ApiResponse, TransportError> {
        let url = self.url(endpoint);
        let transport_error = |err: reqwest::Error| TransportError {
            endpoint: endpoint.name(),
            detail: err.to_string(),
            timed_out: err.is_timeout(),
        };

        let res = self.http.get(&url).send().await.map_err(transport_error)?;

        let status = res.status().as_u16();
        let meta = meta_from_headers(res.headers());
        let body = res.text().await.map_err(transport_error)?;

        tracing::debug!(
            endpoint = endpoint.name(),
            %url,
            status,
            cache = ?meta.cache,
            "sentiment api response"
        );
        Ok(ApiResponse { status, body, meta })
    }
}

fn meta_from_headers(headers: &HeaderMap) -> TransportMeta {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    TransportMeta::from_headers(
        header(HEADER_CACHE),
        header(HEADER_MODE),
        header(HEADER_REQUEST_ID),
    )
}
