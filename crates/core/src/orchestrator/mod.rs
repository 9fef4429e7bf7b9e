use crate::client::{ApiResponse, Endpoint, SentimentApi, TransportError};
use crate::domain::contract;
use crate::domain::error_kind::{classify, ErrorKind};
use crate::domain::sentiment::{FeedItem, HistoryPoint, SentimentResult, TransportMeta};
use crate::domain::symbol::{Symbol, TickerValidator, ValidationError};
use crate::storage::{PendingWrite, RecentsStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::time::Instant;

const DEFAULT_MIN_LATENCY_MS: u64 = 600;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Results are never published sooner than this after `submit`.
    pub min_latency: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(DEFAULT_MIN_LATENCY_MS),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("PIONI_MIN_LATENCY_MS") {
            if let Ok(n) = s.parse::<u64>() {
                out.min_latency = Duration::from_millis(n);
            }
        }

        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    FetchingPrimary,
    FetchingSecondary,
    Settling,
    Failed,
}

impl Phase {
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            Self::Validating | Self::FetchingPrimary | Self::FetchingSecondary | Self::Settling
        )
    }

    pub fn is_fetching_secondary(self) -> bool {
        self == Self::FetchingSecondary
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub op_id: u64,
    pub phase: Phase,
    pub symbol: Option<Symbol>,
    pub error: Option<ErrorKind>,
    pub validation: Option<ValidationError>,
    pub result: Option<SentimentResult>,
    pub feed: Vec<FeedItem>,
    pub history: Vec<HistoryPoint>,
    pub meta: TransportMeta,
    pub recents: Vec<Symbol>,
}

impl Snapshot {
    fn empty(recents: Vec<Symbol>) -> Self {
        Self {
            op_id: 0,
            phase: Phase::Idle,
            symbol: None,
            error: None,
            validation: None,
            result: None,
            feed: Vec::new(),
            history: Vec::new(),
            meta: TransportMeta::default(),
            recents,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Published(Snapshot),
    Failed(Snapshot),
    /// Input never reached the network.
    Rejected(Snapshot),
    /// A newer `submit` took over before this one could publish.
    Superseded,
}

impl SubmitOutcome {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Published(s) | Self::Failed(s) | Self::Rejected(s) => Some(s),
            Self::Superseded => None,
        }
    }
}

struct State {
    current_op: u64,
    snapshot: Snapshot,
    recents: RecentsStore,
}

pub struct Orchestrator {
    api: Arc<dyn SentimentApi>,
    config: OrchestratorConfig,
    state: Mutex<State>,
    /// Taken before `state` is released so recents writes land in state order.
    writes: Mutex<()>,
    tx: watch::Sender<Snapshot>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn SentimentApi>,
        recents: RecentsStore,
        config: OrchestratorConfig,
    ) -> Self {
        let snapshot = Snapshot::empty(recents.list().to_vec());
        let (tx, _rx) = watch::channel(snapshot.clone());
        Self {
            api,
            config,
            state: Mutex::new(State {
                current_op: 0,
                snapshot,
                recents,
            }),
            writes: Mutex::new(()),
            tx,
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Every state transition is sent here; receivers only see the latest one.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub async fn recents(&self) -> Vec<Symbol> {
        self.state.lock().await.recents.list().to_vec()
    }

    pub async fn clear_recents(&self) {
        let mut state = self.state.lock().await;
        let write = state.recents.clear();
        state.snapshot.recents.clear();
        self.tx.send_replace(state.snapshot.clone());

        let order = self.writes.lock().await;
        drop(state);
        commit(order, write).await;
    }

    /// Run one lookup end to end.
    ///
    /// Accepted input invalidates any in-flight lookup. Rejected input only
    /// surfaces the validation error and leaves a running lookup alone.
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        let started = Instant::now();

        let symbol = match TickerValidator::validate(raw) {
            Ok(symbol) => symbol,
            Err(err) => {
                tracing::info!(input = raw, error = %err, "ticker rejected");
                return self.reject(err).await;
            }
        };

        let op_id = self.begin(&symbol).await;
        if !self.update(op_id, |s| s.phase = Phase::FetchingPrimary).await {
            return SubmitOutcome::Superseded;
        }
        tracing::info!(op_id, %symbol, "sentiment lookup started");

        let mut meta = TransportMeta::default();
        let primary = self.api.get(&Endpoint::Sentiment(symbol.clone())).await;
        let provisional = match read_primary(&symbol, primary, &mut meta) {
            Ok(result) => result,
            Err(kind) => return self.fail(op_id, &symbol, kind, meta, started).await,
        };

        let meta_so_far = meta.clone();
        let advanced = self
            .update(op_id, |s| {
                s.phase = Phase::FetchingSecondary;
                s.meta = meta_so_far;
            })
            .await;
        if !advanced {
            tracing::debug!(op_id, %symbol, "superseded after primary call");
            return SubmitOutcome::Superseded;
        }

        let feed_endpoint = Endpoint::Feed(symbol.clone());
        let history_endpoint = Endpoint::History(symbol.clone());
        let (feed_res, history_res) = tokio::join!(
            self.api.get(&feed_endpoint),
            self.api.get(&history_endpoint)
        );
        // Metadata merges in issue order, so history's headers win over feed's.
        let feed = read_secondary(&feed_endpoint, feed_res, &mut meta, contract::parse_feed);
        let history = read_secondary(
            &history_endpoint,
            history_res,
            &mut meta,
            contract::parse_history,
        );

        if !self.update(op_id, |s| s.phase = Phase::Settling).await {
            return SubmitOutcome::Superseded;
        }

        let elapsed = started.elapsed();
        if elapsed < self.config.min_latency {
            tokio::time::sleep(self.config.min_latency - elapsed).await;
        }

        self.publish(op_id, symbol, provisional, feed, history, meta, started).await
    }

    /// Start a new generation for an accepted symbol, superseding any in-flight one.
    async fn begin(&self, symbol: &Symbol) -> u64 {
        let mut state = self.state.lock().await;
        state.current_op += 1;
        let op_id = state.current_op;

        let s = &mut state.snapshot;
        s.op_id = op_id;
        s.phase = Phase::Validating;
        s.symbol = Some(symbol.clone());
        s.error = None;
        s.validation = None;
        s.result = None;
        s.feed.clear();
        s.history.clear();
        s.meta = TransportMeta::default();

        self.tx.send_replace(state.snapshot.clone());
        op_id
    }

    /// Apply `f` only if `op_id` is still the live operation.
    async fn update(&self, op_id: u64, f: impl FnOnce(&mut Snapshot)) -> bool {
        let mut state = self.state.lock().await;
        if state.current_op != op_id {
            return false;
        }
        f(&mut state.snapshot);
        self.tx.send_replace(state.snapshot.clone());
        true
    }

    /// Surface a validation error. The generation is left as is, so a lookup
    /// still in flight keeps its phase and may publish.
    async fn reject(&self, err: ValidationError) -> SubmitOutcome {
        let mut state = self.state.lock().await;
        let in_flight = state.snapshot.phase.is_loading();

        state.snapshot.error = Some(ErrorKind::Validation);
        state.snapshot.validation = Some(err);
        if !in_flight {
            state.snapshot.phase = Phase::Failed;
            self.tx.send_replace(state.snapshot.clone());
            state.snapshot.phase = Phase::Idle;
        }
        self.tx.send_replace(state.snapshot.clone());
        SubmitOutcome::Rejected(state.snapshot.clone())
    }

    async fn fail(
        &self,
        op_id: u64,
        symbol: &Symbol,
        kind: ErrorKind,
        meta: TransportMeta,
        started: Instant,
    ) -> SubmitOutcome {
        let mut state = self.state.lock().await;
        if state.current_op != op_id {
            return SubmitOutcome::Superseded;
        }

        tracing::warn!(
            op_id,
            %symbol,
            error = %kind,
            elapsed_ms = started.elapsed().as_millis(),
            "sentiment lookup failed"
        );

        state.snapshot.phase = Phase::Failed;
        state.snapshot.error = Some(kind);
        state.snapshot.meta = meta;
        self.tx.send_replace(state.snapshot.clone());

        state.snapshot.phase = Phase::Idle;
        self.tx.send_replace(state.snapshot.clone());
        SubmitOutcome::Failed(state.snapshot.clone())
    }

    #[allow(clippy::too_many_arguments)]
    async fn publish(
        &self,
        op_id: u64,
        symbol: Symbol,
        mut result: SentimentResult,
        feed: Vec<FeedItem>,
        history: Vec<HistoryPoint>,
        meta: TransportMeta,
        started: Instant,
    ) -> SubmitOutcome {
        let mut state = self.state.lock().await;
        if state.current_op != op_id {
            tracing::debug!(op_id, %symbol, "superseded before publish; discarding result");
            return SubmitOutcome::Superseded;
        }

        result.meta = (!meta.is_empty()).then(|| meta.clone());
        tracing::info!(
            op_id,
            %symbol,
            sentiment = result.sentiment,
            feed_len = feed.len(),
            history_len = history.len(),
            cache = ?meta.cache,
            elapsed_ms = started.elapsed().as_millis(),
            "sentiment lookup published"
        );

        let write = state.recents.push(symbol);
        let recents = state.recents.list().to_vec();

        let snapshot = &mut state.snapshot;
        snapshot.result = Some(result);
        snapshot.feed = feed;
        snapshot.history = history;
        snapshot.meta = meta;
        snapshot.recents = recents;
        snapshot.phase = Phase::Idle;

        self.tx.send_replace(state.snapshot.clone());
        let published = state.snapshot.clone();

        let order = self.writes.lock().await;
        drop(state);
        commit(order, write).await;

        SubmitOutcome::Published(published)
    }
}

/// Run the blocking store IO on the blocking pool while holding the write-order guard.
async fn commit(_order: MutexGuard<'_, ()>, write: PendingWrite) {
    if let Err(err) = tokio::task::spawn_blocking(move || write.commit()).await {
        tracing::warn!(error = %err, "recents write task failed");
    }
}

fn read_primary(
    symbol: &Symbol,
    res: Result<ApiResponse, TransportError>,
    meta: &mut TransportMeta,
) -> Result<SentimentResult, ErrorKind> {
    let res = match res {
        Ok(res) => res,
        Err(err) => {
            tracing::warn!(%symbol, error = %err, "primary call got no response");
            return Err(classify(None, None, true));
        }
    };

    meta.merge(&res.meta);

    if !res.is_success() {
        let code = contract::parse_error_code(&res.body);
        tracing::debug!(
            %symbol,
            status = res.status,
            code = ?code,
            "primary call returned an error"
        );
        return Err(classify(Some(res.status), code.as_deref(), false));
    }

    contract::parse_sentiment(&res.body, symbol).map_err(|err| {
        tracing::warn!(%symbol, error = %err, "primary payload rejected");
        ErrorKind::Generic
    })
}

fn read_secondary<T>(
    endpoint: &Endpoint,
    res: Result<ApiResponse, TransportError>,
    meta: &mut TransportMeta,
    parse: fn(&str) -> anyhow::Result<Vec<T>>,
) -> Vec<T> {
    let res = match res {
        Ok(res) => res,
        Err(err) => {
            tracing::warn!(
                endpoint = endpoint.name(),
                error = %err,
                "secondary call got no response; using empty data"
            );
            return Vec::new();
        }
    };

    meta.merge(&res.meta);

    if !res.is_success() {
        tracing::debug!(
            endpoint = endpoint.name(),
            status = res.status,
            "secondary call failed; using empty data"
        );
        return Vec::new();
    }

    parse(&res.body).unwrap_or_else(|err| {
        tracing::warn!(
            endpoint = endpoint.name(),
            error = %err,
            "secondary payload rejected; using empty data"
        );
        Vec::new()
    })
}
