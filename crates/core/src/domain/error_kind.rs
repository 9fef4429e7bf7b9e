use serde::Serialize;
use std::fmt;

/// Closed set of outcomes a lookup can end in, besides success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    NotFound,
    NoNews,
    NoSocial,
    ZeroSentiment,
    InsufficientData,
    RateLimited,
    ServerError,
    ServerOffline,
    Generic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::NoNews => "NO_NEWS",
            Self::NoSocial => "NO_SOCIAL",
            Self::ZeroSentiment => "ZERO_SENTIMENT",
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
            Self::ServerOffline => "SERVER_OFFLINE",
            Self::Generic => "GENERIC",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Validation => "Check the ticker",
            Self::NotFound => "Ticker not found",
            Self::NoNews => "No news coverage",
            Self::NoSocial => "No social chatter",
            Self::ZeroSentiment => "Perfectly neutral",
            Self::InsufficientData => "Not enough data",
            Self::RateLimited => "Slow down",
            Self::ServerError => "Server error",
            Self::ServerOffline => "Server offline",
            Self::Generic => "Something went wrong",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Validation => "Tickers are 1 to 5 letters, for example AAPL or TSLA.",
            Self::NotFound => {
                "We couldn't find sentiment data for that ticker. Double-check the symbol."
            }
            Self::NoNews => {
                "There are no recent news articles for this ticker, so a score can't be computed."
            }
            Self::NoSocial => {
                "There are no recent Reddit mentions for this ticker, so a score can't be computed."
            }
            Self::ZeroSentiment => "Recent coverage came out exactly neutral. Try again later.",
            Self::InsufficientData => {
                "There aren't enough recent posts to compute a reliable score."
            }
            Self::RateLimited => "Too many requests right now. Wait a moment and try again.",
            Self::ServerError => "The sentiment service hit an internal error. Try again shortly.",
            Self::ServerOffline => "Couldn't reach the sentiment service. Is the backend running?",
            Self::Generic => "The request failed for an unknown reason. Try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a failed call to its [`ErrorKind`].
///
/// Precedence: transport failure, then the backend's error code, then the HTTP
/// status. `http_status` is `None` only when no response was received.
pub fn classify(
    http_status: Option<u16>,
    error_code: Option<&str>,
    transport_failed: bool,
) -> ErrorKind {
    if transport_failed {
        return ErrorKind::ServerOffline;
    }

    match error_code {
        Some("INVALID_TICKER" | "NO_DATA") => return ErrorKind::NotFound,
        Some("NO_NEWS") => return ErrorKind::NoNews,
        Some("NO_REDDIT") => return ErrorKind::NoSocial,
        Some("ZERO_SENTIMENT") => return ErrorKind::ZeroSentiment,
        Some("TOO_FEW_POSTS") => return ErrorKind::InsufficientData,
        Some("RATE_LIMIT") => return ErrorKind::RateLimited,
        _ => {}
    }

    match http_status {
        Some(429) => ErrorKind::RateLimited,
        Some(status) if status >= 500 => ErrorKind::ServerError,
        _ => ErrorKind::Generic,
    }
}
