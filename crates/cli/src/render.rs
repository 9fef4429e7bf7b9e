use pioni_core::domain::{FeedKind, Symbol};
use pioni_core::orchestrator::Snapshot;
use std::fmt::Write;

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if let Some(kind) = snapshot.error {
        let _ = writeln!(out, "{}: {}", kind.title(), kind.message());
        if let Some(validation) = &snapshot.validation {
            let _ = writeln!(out, "  {validation}");
        }
    }

    if let Some(result) = &snapshot.result {
        let _ = writeln!(
            out,
            "{}  sentiment {:+.2} ({})  confidence {:.0}%",
            result.ticker,
            result.sentiment,
            mood(result.sentiment),
            result.confidence * 100.0
        );
        if let Some(sources) = &result.sources {
            for (name, score) in sources {
                let _ = writeln!(out, "  {name:<10} {score:+.2}");
            }
        }
        for h in &result.highlights {
            let _ = writeln!(out, "  \"{}\" [{} {:+.2}]", h.text, h.source, h.score);
        }
    }

    if !snapshot.history.is_empty() {
        let _ = writeln!(out, "history:");
        for point in &snapshot.history {
            let _ = writeln!(out, "  {}  {:+.2}", point.date, point.score);
        }
    }

    if !snapshot.feed.is_empty() {
        let _ = writeln!(out, "feed:");
        for item in &snapshot.feed {
            let kind = match item.kind {
                FeedKind::News => "news",
                FeedKind::Social => "social",
            };
            let score = item.score.map(|s| format!(" {s:+.2}")).unwrap_or_default();
            let _ = writeln!(
                out,
                "  [{kind}] {} ({}, {}){score}",
                item.title,
                item.source.as_deref().unwrap_or("unknown"),
                item.ago.as_deref().unwrap_or("-"),
            );
        }
    }

    let mut tags = Vec::new();
    if let Some(cache) = &snapshot.meta.cache {
        tags.push(format!("cache={cache}"));
    }
    if let Some(mode) = snapshot.meta.mode {
        tags.push(format!("mode={}", mode.as_str()));
    }
    if !tags.is_empty() {
        let _ = writeln!(out, "({})", tags.join(", "));
    }

    out.trim_end().to_string()
}

pub fn render_recents(recents: &[Symbol]) -> String {
    if recents.is_empty() {
        return "no recent tickers".to_string();
    }
    recents.iter().map(Symbol::as_str).collect::<Vec<_>>().join(" ")
}

pub fn render_health(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("backend HTTP {status}: {detail}")
}

fn mood(score: f64) -> &'static str {
    if score > 0.05 {
        "bullish"
    } else if score < -0.05 {
        "bearish"
    } else {
        "neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pioni_core::domain::{ErrorKind, TransportMeta, ValidationError};
    use pioni_core::orchestrator::Phase;

    fn rejected_snapshot() -> Snapshot {
        Snapshot {
            op_id: 3,
            phase: Phase::Idle,
            symbol: None,
            error: Some(ErrorKind::Validation),
            validation: Some(ValidationError::TooLong {
                truncated: "TOOLO".to_string(),
            }),
            result: None,
            feed: Vec::new(),
            history: Vec::new(),
            meta: TransportMeta::default(),
            recents: Vec::new(),
        }
    }

    #[test]
    fn error_snapshot_shows_title_and_detail() {
        let text = render_snapshot(&rejected_snapshot());
        assert!(text.starts_with("Check the ticker:"));
        assert!(text.contains("shortened to TOOLO"));
        assert!(!text.contains("history:"));
    }

    #[test]
    fn recents_render_in_order() {
        let recents = vec![Symbol::admit("MSFT").unwrap(), Symbol::admit("AAPL").unwrap()];
        assert_eq!(render_recents(&recents), "MSFT AAPL");
        assert_eq!(render_recents(&[]), "no recent tickers");
    }

    #[test]
    fn health_prefers_status_field() {
        assert_eq!(render_health(200, r#"{"status":"running"}"#), "backend HTTP 200: running");
        assert_eq!(render_health(502, "Bad Gateway\n"), "backend HTTP 502: Bad Gateway");
    }

    #[test]
    fn mood_thresholds() {
        assert_eq!(mood(0.3), "bullish");
        assert_eq!(mood(-0.1), "bearish");
        assert_eq!(mood(0.0), "neutral");
    }
}
