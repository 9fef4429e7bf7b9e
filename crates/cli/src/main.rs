use anyhow::Context;
use clap::{Parser, Subcommand};
use pioni_core::client::{Endpoint, HttpSentimentApi, SentimentApi};
use pioni_core::orchestrator::{Orchestrator, OrchestratorConfig, SubmitOutcome};
use pioni_core::storage::{FileStore, RecentsStore};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Debug, Parser)]
#[command(name = "pioni", about = "Look up news and social sentiment for a ticker")]
struct Args {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one sentiment lookup.
    Lookup { ticker: String },

    /// Show recently looked-up tickers.
    Recents {
        /// Forget all recent tickers.
        #[arg(long)]
        clear: bool,
    },

    /// Check that the sentiment backend is reachable.
    Health,

    /// Read tickers from stdin, one per line. A new line supersedes a lookup still in flight.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = pioni_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(args, &settings).await {
        Ok(code) => Ok(ExitCode::from(code)),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "pioni failed");
            Err(err)
        }
    }
}

async fn run(args: Args, settings: &pioni_core::config::Settings) -> anyhow::Result<u8> {
    let api = Arc::new(HttpSentimentApi::from_settings(settings)?);
    let recents = RecentsStore::load(Arc::new(FileStore::new(settings.data_dir())));
    let orch = Arc::new(Orchestrator::new(
        api.clone(),
        recents,
        OrchestratorConfig::from_env(),
    ));

    match args.command {
        Command::Lookup { ticker } => {
            let outcome = orch.submit(&ticker).await;
            let Some(snapshot) = outcome.snapshot() else {
                anyhow::bail!("lookup was superseded");
            };
            print_snapshot(snapshot, args.json)?;
            Ok(exit_code(&outcome))
        }
        Command::Recents { clear } => {
            if clear {
                orch.clear_recents().await;
                tracing::info!("recents cleared");
            }
            let recents = orch.recents().await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&recents)?);
            } else {
                println!("{}", render::render_recents(&recents));
            }
            Ok(0)
        }
        Command::Health => {
            let res = api
                .get(&Endpoint::Health)
                .await
                .with_context(|| format!("{} backend unreachable", api.provider_name()))?;
            println!("{}", render::render_health(res.status, &res.body));
            Ok(if res.is_success() { 0 } else { 1 })
        }
        Command::Watch => watch(orch, args.json).await,
    }
}

async fn watch(orch: Arc<Orchestrator>, json: bool) -> anyhow::Result<u8> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inflight = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let orch = orch.clone();
                inflight.spawn(async move { orch.submit(&line).await });
            }
            Some(joined) = inflight.join_next() => {
                report(joined?, json)?;
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(130);
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        report(joined?, json)?;
    }
    Ok(0)
}

fn report(outcome: SubmitOutcome, json: bool) -> anyhow::Result<()> {
    match outcome.snapshot() {
        Some(snapshot) => print_snapshot(snapshot, json),
        None => {
            tracing::debug!("superseded lookup dropped");
            Ok(())
        }
    }
}

fn print_snapshot(snapshot: &pioni_core::orchestrator::Snapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        println!("{}", render::render_snapshot(snapshot));
    }
    Ok(())
}

fn exit_code(outcome: &SubmitOutcome) -> u8 {
    match outcome {
        SubmitOutcome::Published(_) => 0,
        SubmitOutcome::Rejected(_) => 2,
        SubmitOutcome::Failed(_) | SubmitOutcome::Superseded => 1,
    }
}

fn init_sentry(settings: &pioni_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
