// Draft state monitor: the polling loop that turns wholesale re-fetches into
// ordered pick and turn events.
//
// One task owns the monitor and its `MonitorState`. Each tick fetches,
// diffs, emits picks, then re-derives the watched seat's turn phase.
// Recommendation work runs on spawned tasks funneled through the cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use draftwatch_core::config::Config;
use draftwatch_core::draft::diff::detect_new_picks;
use draftwatch_core::draft::pick::Pick;
use draftwatch_core::draft::snake;
use draftwatch_core::protocol::{
    DraftSnapshot, MonitorEvent, Recommendation, RecommendationContext, RecommendationKey,
    WatchedSeat,
};
use draftwatch_core::recommend::RecommendationEngine;
use draftwatch_core::DraftError;

use crate::cache::RecommendationCache;
use crate::source::DraftSource;
use crate::state::{MonitorState, TurnStatus, TurnTransition};

// ---------------------------------------------------------------------------
// Settings and commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Picks-until-turn at or below which the turn counts as approaching.
    pub warning_threshold: u32,
    /// How long a computed recommendation is reused.
    pub freshness: Duration,
    /// League-wide picks handed to the recommendation engine.
    pub recent_picks: usize,
    /// Pinned league size; `None` adopts it from the first fetch.
    pub league_size: Option<u32>,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        MonitorSettings {
            warning_threshold: config.monitor.warning_threshold,
            freshness: config.monitor.freshness_window(),
            recent_picks: config.llm.recent_picks,
            league_size: config.league.size,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            warning_threshold: 3,
            freshness: Duration::from_secs(300),
            recent_picks: 12,
            league_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    SetWatchedSeat(WatchedSeat),
}

fn validate_watched(seat: &WatchedSeat) -> Result<(), DraftError> {
    match seat {
        WatchedSeat::Position(0) => Err(DraftError::InvalidArgument {
            field: "watched_seat",
            message: "must be >= 1".into(),
        }),
        WatchedSeat::Team(id) if id.trim().is_empty() => Err(DraftError::InvalidArgument {
            field: "watched_team_id",
            message: "must not be empty".into(),
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// DraftMonitor
// ---------------------------------------------------------------------------

pub struct DraftMonitor {
    source: Arc<dyn DraftSource>,
    engine: Option<Arc<dyn RecommendationEngine>>,
    cache: RecommendationCache<Recommendation>,
    settings: MonitorSettings,
    state: MonitorState,
    events: mpsc::Sender<MonitorEvent>,
    /// Flips to `true` when the running loop is told to stop. Spawned
    /// recommendation tasks check it before emitting.
    stopped: watch::Receiver<bool>,
}

impl DraftMonitor {
    /// Fails with `InvalidArgument` for a zero seat or league size.
    pub fn new(
        source: Arc<dyn DraftSource>,
        engine: Option<Arc<dyn RecommendationEngine>>,
        settings: MonitorSettings,
        watched: WatchedSeat,
        events: mpsc::Sender<MonitorEvent>,
    ) -> Result<Self, DraftError> {
        validate_watched(&watched)?;
        if let Some(size) = settings.league_size {
            if size == 0 {
                return Err(DraftError::InvalidArgument {
                    field: "league_size",
                    message: "must be >= 1".into(),
                });
            }
            if let WatchedSeat::Position(seat) = watched {
                if seat > size {
                    return Err(DraftError::InvalidArgument {
                        field: "watched_seat",
                        message: format!("must be within 1..={size}, got {seat}"),
                    });
                }
            }
        }

        let (_, stopped) = watch::channel(false);
        Ok(DraftMonitor {
            source,
            engine,
            cache: RecommendationCache::new(settings.freshness),
            state: MonitorState::new(watched, settings.league_size),
            settings,
            events,
            stopped,
        })
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn cache(&self) -> &RecommendationCache<Recommendation> {
        &self.cache
    }

    /// Spawn the polling loop. The first poll runs immediately.
    pub fn start(mut self, poll_interval: Duration) -> Result<MonitorHandle, DraftError> {
        if poll_interval.is_zero() {
            return Err(DraftError::InvalidArgument {
                field: "poll_interval",
                message: "must be greater than zero".into(),
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        self.stopped = stop_rx.clone();

        let task = tokio::spawn(self.run(poll_interval, stop_rx, cmd_rx));
        Ok(MonitorHandle {
            stop_tx,
            cmd_tx,
            task: Some(task),
        })
    }

    /// Switch the watched seat. Ends an active turn first.
    pub async fn set_watched_seat(&mut self, seat: WatchedSeat) -> Result<(), DraftError> {
        validate_watched(&seat)?;
        info!("Watching {:?}", seat);
        if let Some(TurnTransition::Ended { overall }) = self.state.set_watched_seat(seat) {
            self.emit(MonitorEvent::TurnEnded { overall }).await;
        }
        Ok(())
    }

    /// Fetch once and process the result. A failed fetch leaves the state
    /// untouched.
    pub async fn poll_once(&mut self) -> Result<(), DraftError> {
        let snapshot = self.source.fetch_draft_state().await?;
        self.process_snapshot(snapshot).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Polling loop
    // -----------------------------------------------------------------------

    async fn run(
        mut self,
        poll_interval: Duration,
        mut stop_rx: watch::Receiver<bool>,
        mut cmd_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        info!("Draft monitor started, polling every {:?}", poll_interval);

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = stop_rx.changed() => {
                    info!("Stop requested, monitor going idle");
                    break;
                }

                Some(cmd) = cmd_rx.recv() => {
                    match cmd {
                        MonitorCommand::SetWatchedSeat(seat) => {
                            if let Err(e) = self.set_watched_seat(seat).await {
                                warn!("Rejected watched seat: {e}");
                            }
                        }
                    }
                }

                _ = ticker.tick() => {
                    if !self.poll_until_stopped(poll_interval, &mut stop_rx).await {
                        break;
                    }
                }
            }
        }

        info!("Draft monitor stopped");
        // Tasks from this run keep the old receiver and stay discarded.
        self.stopped = watch::channel(false).1;
        self
    }

    /// One tick. Returns `false` when a stop arrived mid-fetch.
    async fn poll_until_stopped(
        &mut self,
        poll_interval: Duration,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> bool {
        let started = Instant::now();
        let source = Arc::clone(&self.source);
        let fetch = tokio::spawn(async move { source.fetch_draft_state().await });

        let fetched = tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                info!("Stop requested mid-fetch; its result will be discarded");
                return false;
            }
            joined = fetch => joined,
        };

        match fetched {
            Ok(Ok(snapshot)) => self.process_snapshot(snapshot).await,
            Ok(Err(e)) => warn!("Draft fetch failed, retrying next tick: {e}"),
            Err(e) => error!("Draft fetch task failed: {e}"),
        }

        let elapsed = started.elapsed();
        if elapsed >= poll_interval {
            warn!(
                "Poll took {:?}, longer than the {:?} interval; skipping missed ticks",
                elapsed, poll_interval
            );
        }
        true
    }

    // -----------------------------------------------------------------------
    // Tick processing
    // -----------------------------------------------------------------------

    async fn process_snapshot(&mut self, snapshot: DraftSnapshot) {
        let batch = detect_new_picks(&snapshot.picks, self.state.last_processed());

        if batch.has_gap {
            warn!(
                "{} picks missing from the feed, first {:?} (contiguous through #{})",
                batch.missing_count, batch.missing, batch.contiguous_through
            );
            self.emit(MonitorEvent::GapDetected {
                missing: batch.missing.clone(),
                missing_count: batch.missing_count,
            })
            .await;
        }

        for pick in &batch.picks {
            info!("Pick {}", pick);
            self.emit(MonitorEvent::PickDetected(pick.clone())).await;
        }
        self.state.advance_to(batch.high_water);

        self.update_turn(&snapshot).await;
    }

    async fn update_turn(&mut self, snapshot: &DraftSnapshot) {
        let status = match self.state.predict(snapshot) {
            Ok(status) => status,
            Err(e) => {
                if self.state.halt_tracking() {
                    warn!("Turn tracking halted: {e}");
                    self.emit(MonitorEvent::TurnTrackingHalted {
                        message: e.to_string(),
                    })
                    .await;
                } else {
                    debug!("Turn tracking still halted: {e}");
                }
                return;
            }
        };

        if self.state.resume_tracking() {
            info!("Turn tracking resumed");
            self.emit(MonitorEvent::TurnTrackingResumed).await;
        }

        let key = RecommendationKey {
            overall: status.next_overall(),
            seat: status.seat,
        };

        let transitions = self.state.apply_turn_status(
            status.picks_until_turn,
            status.current_overall,
            self.settings.warning_threshold,
        );

        for transition in transitions {
            let event = match transition {
                TurnTransition::Approaching {
                    picks_until_turn,
                    next_overall,
                } => {
                    info!(
                        "Turn approaching: {} picks until #{}",
                        picks_until_turn, next_overall
                    );
                    MonitorEvent::TurnApproaching {
                        picks_until_turn,
                        next_overall,
                    }
                }
                TurnTransition::Started { overall } => {
                    info!("On the clock at #{}", overall);
                    MonitorEvent::MyTurnStarted {
                        overall,
                        recommendation: self.cache.peek(&key),
                    }
                }
                TurnTransition::Ended { overall } => {
                    info!("Turn at #{} ended", overall);
                    MonitorEvent::TurnEnded { overall }
                }
            };
            self.emit(event).await;
        }

        if self.state.phase().wants_recommendation() {
            self.request_recommendation(key, &status, snapshot);
        }
    }

    /// Spawn a recommendation task for `key` unless one is cached or
    /// already running.
    fn request_recommendation(
        &self,
        key: RecommendationKey,
        status: &TurnStatus,
        snapshot: &DraftSnapshot,
    ) {
        let Some(engine) = &self.engine else {
            return;
        };
        if self.cache.peek(&key).is_some() || self.cache.is_in_flight(&key) {
            return;
        }

        let context = match self.build_context(key, status, snapshot) {
            Ok(context) => context,
            Err(e) => {
                warn!("Cannot build recommendation context: {e}");
                return;
            }
        };

        debug!(?key, "requesting recommendation");
        let engine = Arc::clone(engine);
        let compute = self.cache.get_or_compute(
            key,
            status.current_overall,
            status.league_size,
            move || async move { engine.recommend(context).await },
        );
        let events = self.events.clone();
        let stopped = self.stopped.clone();

        tokio::spawn(async move {
            let outcome = compute.await;
            if *stopped.borrow() {
                debug!(?key, "discarding recommendation after stop");
                return;
            }
            let event = match outcome {
                Ok(recommendation) => {
                    info!("Recommendation ready for #{}", key.overall);
                    MonitorEvent::RecommendationReady {
                        key,
                        recommendation,
                    }
                }
                Err(e) => {
                    warn!("Recommendation for #{} failed: {e}", key.overall);
                    MonitorEvent::RecommendationFailed {
                        key,
                        message: e.to_string(),
                    }
                }
            };
            let _ = events.send(event).await;
        });
    }

    fn build_context(
        &self,
        key: RecommendationKey,
        status: &TurnStatus,
        snapshot: &DraftSnapshot,
    ) -> Result<RecommendationContext, DraftError> {
        let mut picks: Vec<&Pick> = snapshot.picks.iter().collect();
        picks.sort_by_key(|p| p.overall);
        picks.dedup_by_key(|p| p.overall);

        let my_picks = picks
            .iter()
            .filter(|p| p.seat == key.seat)
            .map(|p| (*p).clone())
            .collect();
        let skip = picks.len().saturating_sub(self.settings.recent_picks);
        let recent_picks = picks[skip..].iter().map(|p| (*p).clone()).collect();

        Ok(RecommendationContext {
            key,
            league_size: status.league_size,
            round: snake::round_of(key.overall, status.league_size)?,
            pick_in_round: snake::pick_in_round(key.overall, status.league_size)?,
            picks_until_turn: status.picks_until_turn,
            team_id: snapshot.draft_order.team_at(key.seat).map(str::to_string),
            my_picks,
            recent_picks,
        })
    }

    async fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// MonitorHandle
// ---------------------------------------------------------------------------

/// Control surface of a running monitor. Dropping it stops the monitor.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    cmd_tx: mpsc::Sender<MonitorCommand>,
    task: Option<JoinHandle<DraftMonitor>>,
}

impl MonitorHandle {
    /// Stop polling. An in-flight fetch or recommendation may finish, but
    /// nothing more is emitted.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub async fn set_watched_seat(&self, seat: WatchedSeat) -> Result<(), DraftError> {
        validate_watched(&seat)?;
        self.cmd_tx
            .send(MonitorCommand::SetWatchedSeat(seat))
            .await
            .map_err(|_| DraftError::InvalidArgument {
                field: "monitor",
                message: "monitor is not running".into(),
            })
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to exit and get the idle monitor back, ready to be
    /// started again.
    pub async fn join(mut self) -> anyhow::Result<DraftMonitor> {
        let task = self
            .task
            .take()
            .ok_or_else(|| anyhow::anyhow!("monitor task already joined"))?;
        Ok(task.await?)
    }

    /// `stop` followed by `join`.
    pub async fn shutdown(self) -> anyhow::Result<DraftMonitor> {
        self.stop();
        self.join().await
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}
