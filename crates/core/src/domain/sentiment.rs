use crate::domain::symbol::Symbol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub ticker: Symbol,
    /// Nominally in [-1, 1]; the backend is trusted and values are not clamped.
    pub sentiment: f64,
    /// Nominally in [0, 1].
    pub confidence: f64,
    pub sources: Option<BTreeMap<String, f64>>,
    pub highlights: Vec<Highlight>,
    pub meta: Option<TransportMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub source: String,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    News,
    #[serde(alias = "reddit")]
    Social,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FeedKind,
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Relative age as rendered by the backend, e.g. "45 min ago".
    #[serde(default)]
    pub ago: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingMode {
    Live,
    Mock,
}

impl ServingMode {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "live" | "real" => Some(Self::Live),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

/// Cache and serving-mode indicators reported in response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportMeta {
    /// Uppercased cache token: HIT, MISS, STALE or MOCK.
    pub cache: Option<String>,
    pub mode: Option<ServingMode>,
    pub request_id: Option<String>,
}

impl TransportMeta {
    pub fn from_headers(cache: Option<&str>, mode: Option<&str>, request_id: Option<&str>) -> Self {
        let cache = cache
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty());
        let mode = mode.and_then(ServingMode::parse).or_else(|| {
            // The mock backend only marks itself through the cache header.
            (cache.as_deref() == Some("MOCK")).then_some(ServingMode::Mock)
        });
        let request_id = request_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            cache,
            mode,
            request_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_none() && self.mode.is_none() && self.request_id.is_none()
    }

    /// Overwrite with whatever `later` observed; fields it did not report are kept.
    pub fn merge(&mut self, later: &TransportMeta) {
        if later.cache.is_some() {
            self.cache.clone_from(&later.cache);
        }
        if later.mode.is_some() {
            self.mode = later.mode;
        }
        if later.request_id.is_some() {
            self.request_id.clone_from(&later.request_id);
        }
    }
}
