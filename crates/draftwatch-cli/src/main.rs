// draftwatch entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Build the ESPN source and, when an API key is set, the LLM engine
// 4. Start the monitor
// 5. Print events until Ctrl+C, then stop the monitor

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use draftwatch_app::{DraftMonitor, DraftSource, EspnDraftSource, MonitorSettings};
use draftwatch_core::config;
use draftwatch_core::protocol::MonitorEvent;
use draftwatch_core::recommend::RecommendationEngine;
use draftwatch_llm::LlmRecommender;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("draftwatch starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season={}, poll every {}s",
        config.league.league_id,
        config.league.season_or_current(),
        config.monitor.poll_interval_secs
    );

    // 3. Source and engine
    let source = EspnDraftSource::from_config(&config).context("failed to build ESPN client")?;
    info!("Polling {}", source.url());
    let source: Arc<dyn DraftSource> = Arc::new(source);

    let engine: Option<Arc<dyn RecommendationEngine>> = match LlmRecommender::from_config(&config)
    {
        Some(recommender) => {
            info!("LLM recommendations enabled (model {})", config.llm.model);
            Some(Arc::new(recommender))
        }
        None => {
            info!("LLM recommendations disabled (no API key)");
            None
        }
    };

    // 4. Monitor
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let monitor = DraftMonitor::new(
        source,
        engine,
        MonitorSettings::from_config(&config),
        config.monitor.watched_seat(),
        events_tx,
    )
    .context("invalid monitor settings")?;
    let handle = monitor
        .start(config.monitor.poll_interval())
        .context("failed to start monitor")?;

    println!(
        "draftwatch: watching {:?} in league {} (Ctrl+C to quit)",
        config.monitor.watched_seat(),
        config.league.league_id
    );

    // 5. Event loop
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(event) => println!("{}", describe(&event)),
                    None => {
                        error!("Monitor event channel closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await.context("monitor task failed")?;
    info!("draftwatch shut down cleanly");
    Ok(())
}

/// One-line terminal rendering of a monitor event.
fn describe(event: &MonitorEvent) -> String {
    match event {
        MonitorEvent::PickDetected(pick) => format!("PICK  {pick}"),
        MonitorEvent::GapDetected {
            missing,
            missing_count,
        } => format!("GAP   {missing_count} picks never seen, first {missing:?}"),
        MonitorEvent::TurnApproaching {
            picks_until_turn,
            next_overall,
        } => format!("SOON  {picks_until_turn} picks until you pick #{next_overall}"),
        MonitorEvent::MyTurnStarted {
            overall,
            recommendation,
        } => match recommendation {
            Some(rec) => format!("TURN  you are on the clock at #{overall}\n{}", rec.text),
            None => format!("TURN  you are on the clock at #{overall}"),
        },
        MonitorEvent::TurnEnded { overall } => format!("DONE  turn at #{overall} is over"),
        MonitorEvent::RecommendationReady {
            key,
            recommendation,
        } => format!("ADVICE for #{}\n{}", key.overall, recommendation.text),
        MonitorEvent::RecommendationFailed { key, message } => {
            format!("ADVICE for #{} unavailable: {message}", key.overall)
        }
        MonitorEvent::TurnTrackingHalted { message } => {
            format!("WARN  turn tracking paused: {message}")
        }
        MonitorEvent::TurnTrackingResumed => "INFO  turn tracking resumed".to_string(),
    }
}

/// Initialize tracing to log to a file, keeping stdout for events.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftwatch.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftwatch=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
