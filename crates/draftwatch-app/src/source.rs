// Draft-data source: the fetch seam plus the ESPN league API implementation.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use draftwatch_core::config::Config;
use draftwatch_core::draft::order::DraftOrder;
use draftwatch_core::draft::pick::{Pick, PlayerRef, Position};
use draftwatch_core::protocol::DraftSnapshot;
use draftwatch_core::DraftError;

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Http(String),

    #[error("server returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<SourceError> for DraftError {
    fn from(err: SourceError) -> Self {
        DraftError::TransientFetch(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = err.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Http(err.to_string())
        }
    }
}

/// Where the monitor gets the draft from. Re-fetched wholesale each tick.
#[async_trait]
pub trait DraftSource: Send + Sync {
    async fn fetch_draft_state(&self) -> Result<DraftSnapshot, SourceError>;
}

// ---------------------------------------------------------------------------
// ESPN league API
// ---------------------------------------------------------------------------

pub struct EspnDraftSource {
    http: reqwest::Client,
    url: String,
    cookie: Option<String>,
}

impl EspnDraftSource {
    pub fn new(
        base_url: &str,
        season: i32,
        league_id: u64,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(EspnDraftSource {
            http,
            url: format!(
                "{}/seasons/{season}/segments/0/leagues/{league_id}",
                base_url.trim_end_matches('/')
            ),
            cookie: None,
        })
    }

    /// Send `espn_s2` / `SWID` cookies, needed for private leagues.
    pub fn with_cookies(mut self, espn_s2: &str, swid: &str) -> Self {
        self.cookie = Some(format!("espn_s2={espn_s2}; SWID={swid}"));
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let source = Self::new(
            &config.espn.base_url,
            config.league.season_or_current(),
            config.league.league_id,
            Duration::from_secs(config.espn.request_timeout_secs),
        )?;
        match (&config.credentials.espn_s2, &config.credentials.swid) {
            (Some(s2), Some(swid)) => Ok(source.with_cookies(s2, swid)),
            (None, None) => Ok(source),
            _ => {
                warn!("Only one of espn_s2 / swid is set; sending no cookies");
                Ok(source)
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DraftSource for EspnDraftSource {
    async fn fetch_draft_state(&self) -> Result<DraftSnapshot, SourceError> {
        let mut request = self.http.get(&self.url).query(&[
            ("view", "mDraftDetail"),
            ("view", "mSettings"),
            ("view", "mTeam"),
        ]);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let league: LeagueResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let snapshot = snapshot_from_league(league)?;
        debug!(
            picks = snapshot.picks.len(),
            current = snapshot.current_overall,
            "fetched draft state"
        );
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// ESPN response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LeagueResponse {
    #[serde(default)]
    draft_detail: DraftDetail,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    teams: Vec<TeamEntry>,
    #[serde(default)]
    players: Vec<PlayerEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftDetail {
    #[serde(default)]
    picks: Vec<PickEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickEntry {
    overall_pick_number: u32,
    team_id: i64,
    #[serde(default)]
    player_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    draft_settings: DraftSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftSettings {
    #[serde(default)]
    pick_order: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamEntry {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
}

impl TeamEntry {
    fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.trim().to_string());
        }
        let joined = [self.location.as_deref(), self.nickname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    id: i64,
    #[serde(default)]
    player: Option<PlayerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerInfo {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    default_position_id: Option<u16>,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Convert an ESPN league payload into a snapshot.
///
/// Pick slots without a player (`playerId <= 0`) are not made yet and are
/// skipped. An unusable pick order is logged and left empty so pick
/// detection keeps working. The pick on the clock follows the highest made
/// pick, so repeated or missing entries in the feed don't shift it.
pub(crate) fn snapshot_from_league(league: LeagueResponse) -> Result<DraftSnapshot, SourceError> {
    let pick_order = &league.settings.draft_settings.pick_order;
    let league_size = league
        .settings
        .size
        .filter(|&n| n > 0)
        .or_else(|| u32::try_from(pick_order.len()).ok().filter(|&n| n > 0))
        .or_else(|| u32::try_from(league.teams.len()).ok().filter(|&n| n > 0))
        .ok_or_else(|| SourceError::Malformed("league size unknown".into()))?;

    let draft_order = match DraftOrder::from_pick_order(pick_order.iter().map(i64::to_string)) {
        Ok(order) => order,
        Err(e) => {
            warn!("Ignoring ESPN pick order: {e}");
            DraftOrder::default()
        }
    };

    let team_names: HashMap<i64, String> = league
        .teams
        .iter()
        .filter_map(|t| t.display_name().map(|name| (t.id, name)))
        .collect();

    let players: HashMap<i64, &PlayerInfo> = league
        .players
        .iter()
        .filter_map(|p| p.player.as_ref().map(|info| (p.id, info)))
        .collect();

    let mut picks = Vec::new();
    for entry in &league.draft_detail.picks {
        if entry.player_id <= 0 || entry.overall_pick_number == 0 {
            continue;
        }
        let info = players.get(&entry.player_id);
        let name = info
            .and_then(|i| i.full_name.clone())
            .unwrap_or_else(|| format!("Player {}", entry.player_id));
        let position = info
            .and_then(|i| i.default_position_id)
            .and_then(Position::from_espn_id);

        let pick = Pick::new(
            entry.overall_pick_number,
            league_size,
            entry.team_id.to_string(),
            PlayerRef::new(entry.player_id.to_string(), name).with_position(position),
        )
        .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let pick = match team_names.get(&entry.team_id) {
            Some(team_name) => pick.with_team_name(team_name.clone()),
            None => pick,
        };
        picks.push(pick);
    }

    let made: BTreeSet<u32> = picks.iter().map(|p| p.overall).collect();
    let completed = u32::try_from(made.len())
        .map_err(|_| SourceError::Malformed("too many picks".into()))?;
    let last_made = made.last().copied().unwrap_or(0);

    // Anything more than a round past the completed count is corrupt.
    if last_made > completed.saturating_add(league_size) {
        return Err(SourceError::Malformed(format!(
            "pick #{last_made} is implausible with {completed} picks made"
        )));
    }

    Ok(DraftSnapshot {
        picks,
        draft_order,
        league_size,
        current_overall: last_made.saturating_add(1),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
