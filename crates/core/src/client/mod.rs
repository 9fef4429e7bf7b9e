use crate::domain::sentiment::TransportMeta;
use crate::domain::symbol::Symbol;
use std::fmt;

pub mod http;

pub use http::HttpSentimentApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Sentiment(Symbol),
    Feed(Symbol),
    History(Symbol),
    Health,
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Self::Sentiment(symbol) => format!("/sentiment/{symbol}"),
            Self::Feed(symbol) => format!("/sentiment/feed/{symbol}"),
            Self::History(symbol) => format!("/sentiment/history/{symbol}"),
            Self::Health => "/health".to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sentiment(_) => "sentiment",
            Self::Feed(_) => "feed",
            Self::History(_) => "history",
            Self::Health => "health",
        }
    }
}

/// A response that arrived, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub meta: TransportMeta,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received: connect failure, timeout, or a body that could not be read.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub endpoint: &'static str,
    pub detail: String,
    pub timed_out: bool,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transport error (endpoint={}, timed_out={}): {}",
            self.endpoint, self.timed_out, self.detail
        )
    }
}

impl std::error::Error for TransportError {}

#[async_trait::async_trait]
pub trait SentimentApi: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn get(&self, endpoint: &Endpoint) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        let symbol = Symbol::admit("TSLA").unwrap();
        assert_eq!(Endpoint::Sentiment(symbol.clone()).path(), "/sentiment/TSLA");
        assert_eq!(Endpoint::Feed(symbol.clone()).path(), "/sentiment/feed/TSLA");
        assert_eq!(Endpoint::History(symbol).path(), "/sentiment/history/TSLA");
        assert_eq!(Endpoint::Health.path(), "/health");
    }
}
