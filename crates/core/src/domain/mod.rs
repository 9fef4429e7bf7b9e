pub mod contract;
pub mod error_kind;
pub mod sentiment;
pub mod symbol;

pub use error_kind::{classify, ErrorKind};
pub use sentiment::{
    FeedItem, FeedKind, Highlight, HistoryPoint, SentimentResult, ServingMode, TransportMeta,
};
pub use symbol::{NormalizedTicker, Symbol, TickerValidator, ValidationError};
