use crate::domain::sentiment::{FeedItem, Highlight, HistoryPoint, SentimentResult};
use crate::domain::symbol::Symbol;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of a successful `GET /sentiment/{symbol}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPayload {
    pub ticker: String,
    #[serde(alias = "sentiment_score")]
    pub sentiment: f64,
    pub confidence: f64,
    #[serde(default)]
    pub sources: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub highlights: Option<Vec<Highlight>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPayload {
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

impl SentimentPayload {
    pub fn validate_and_into_result(self, expected: &Symbol) -> anyhow::Result<SentimentResult> {
        let ticker = self.ticker.trim().to_ascii_uppercase();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");
        ensure!(self.sentiment.is_finite(), "sentiment must be finite (got {})", self.sentiment);
        ensure!(self.confidence.is_finite(), "confidence must be finite (got {})", self.confidence);

        if ticker != expected.as_str() {
            tracing::warn!(%expected, returned = %ticker, "sentiment payload ticker mismatch");
        }
        if !(-1.0..=1.0).contains(&self.sentiment) || !(0.0..=1.0).contains(&self.confidence) {
            tracing::debug!(
                sentiment = self.sentiment,
                confidence = self.confidence,
                "sentiment payload outside nominal range"
            );
        }

        let sources = self
            .sources
            .map(|m| m.into_iter().filter(|(_, v)| v.is_finite()).collect::<BTreeMap<_, _>>())
            .filter(|m| !m.is_empty());

        Ok(SentimentResult {
            ticker: expected.clone(),
            sentiment: self.sentiment,
            confidence: self.confidence,
            sources,
            highlights: self.highlights.unwrap_or_default(),
            meta: None,
        })
    }
}

pub fn parse_sentiment(text: &str, expected: &Symbol) -> anyhow::Result<SentimentResult> {
    let parsed = serde_json::from_str::<SentimentPayload>(text)
        .with_context(|| format!("sentiment response does not match schema: {text}"))?;
    parsed.validate_and_into_result(expected)
}

pub fn parse_feed(text: &str) -> anyhow::Result<Vec<FeedItem>> {
    let parsed = serde_json::from_str::<FeedPayload>(text)
        .context("feed response does not match schema")?;
    Ok(parsed.items)
}

pub fn parse_history(text: &str) -> anyhow::Result<Vec<HistoryPoint>> {
    let parsed = serde_json::from_str::<HistoryPayload>(text)
        .context("history response does not match schema")?;
    Ok(parsed.history)
}

/// Error code from a failed response: `{"error": code}` or `{"detail": {"error": code}}`.
pub fn parse_error_code(text: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(text).ok()?;
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| value.get("detail")?.get("error")?.as_str())?;

    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::FeedKind;
    use chrono::NaiveDate;
    use serde_json::json;

    fn tsla() -> Symbol {
        Symbol::admit("TSLA").unwrap()
    }

    #[test]
    fn parses_full_sentiment_payload() {
        let body = json!({
            "ticker": "TSLA",
            "sentiment": 0.3,
            "confidence": 0.5,
            "sources": {"newsapi": 0.2, "reddit": 0.4},
            "highlights": [{"source": "newsapi", "text": "beat", "score": 0.9}]
        })
        .to_string();

        let result = parse_sentiment(&body, &tsla()).unwrap();
        assert_eq!(result.ticker, tsla());
        assert_eq!(result.sentiment, 0.3);
        assert_eq!(result.sources.unwrap().get("reddit").copied(), Some(0.4));
        assert_eq!(result.highlights.len(), 1);
        assert!(result.meta.is_none());
    }

    #[test]
    fn accepts_legacy_score_field_and_missing_optionals() {
        let body = json!({"ticker": "tsla", "sentiment_score": 0.72, "confidence": 0.85}).to_string();
        let result = parse_sentiment(&body, &tsla()).unwrap();
        assert_eq!(result.sentiment, 0.72);
        assert!(result.sources.is_none());
        assert!(result.highlights.is_empty());
    }

    #[test]
    fn rejects_payload_without_score() {
        let body = json!({"ticker": "TSLA", "confidence": 0.5}).to_string();
        assert!(parse_sentiment(&body, &tsla()).is_err());
        assert!(parse_sentiment("<html>oops</html>", &tsla()).is_err());
    }

    #[test]
    fn rejects_blank_ticker() {
        let body = json!({"ticker": "  ", "sentiment": 0.1, "confidence": 0.5}).to_string();
        assert!(parse_sentiment(&body, &tsla()).is_err());
    }

    #[test]
    fn parses_feed_and_history() {
        let feed = json!({"ticker": "TSLA", "items": [
            {"id": "news-0", "type": "news", "title": "a", "source": "Wire", "ago": "45 min ago", "score": 0.1},
            {"id": "reddit-0", "type": "reddit", "title": "b"}
        ]})
        .to_string();
        let items = parse_feed(&feed).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kind, FeedKind::Social);

        let history = json!({"ticker": "TSLA", "history": [
            {"date": "2026-01-02", "score": 0.2},
            {"date": "2026-01-03", "score": -0.1}
        ]})
        .to_string();
        let points = parse_history(&history).unwrap();
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(points[1].score, -0.1);

        assert!(parse_history(&json!({"ticker": "TSLA"}).to_string()).unwrap().is_empty());
    }

    #[test]
    fn error_code_from_either_shape() {
        assert_eq!(parse_error_code(r#"{"error":"RATE_LIMIT"}"#).as_deref(), Some("RATE_LIMIT"));
        assert_eq!(
            parse_error_code(r#"{"detail":{"error":"NO_NEWS","message":"x","request_id":"r"}}"#).as_deref(),
            Some("NO_NEWS")
        );
        assert_eq!(parse_error_code(r#"{"detail":"Not Found"}"#), None);
        assert_eq!(parse_error_code("Service Unavailable"), None);
        assert_eq!(parse_error_code(""), None);
    }
}
