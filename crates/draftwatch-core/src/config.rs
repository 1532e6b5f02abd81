// Configuration loading and parsing (draftwatch.toml, credentials.toml).

use chrono::Datelike;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::WatchedSeat;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub monitor: MonitorConfig,
    pub espn: EspnConfig,
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// draftwatch.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draftwatch.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    league: LeagueConfig,
    monitor: MonitorConfig,
    #[serde(default)]
    espn: EspnConfig,
    llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    /// ESPN league ID.
    pub league_id: u64,
    /// Season year. Defaults to the current calendar year.
    #[serde(default)]
    pub season: Option<i32>,
    /// Number of seats. When omitted, taken from the first successful fetch.
    #[serde(default)]
    pub size: Option<u32>,
}

impl LeagueConfig {
    pub fn season_or_current(&self) -> i32 {
        self.season.unwrap_or_else(|| chrono::Utc::now().year())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    /// Picks-until-turn at or below which the turn counts as approaching.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u32,
    #[serde(default)]
    pub watched_seat: Option<u32>,
    #[serde(default)]
    pub watched_team_id: Option<String>,
    /// How long a computed recommendation stays fresh.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

fn default_warning_threshold() -> u32 {
    3
}

fn default_freshness_secs() -> u64 {
    300
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// The configured watched seat. Validation guarantees exactly one of
    /// `watched_seat` / `watched_team_id` is set.
    pub fn watched_seat(&self) -> WatchedSeat {
        match (&self.watched_team_id, self.watched_seat) {
            (Some(team), _) => WatchedSeat::Team(team.clone()),
            (None, Some(seat)) => WatchedSeat::Position(seat),
            (None, None) => WatchedSeat::Position(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspnConfig {
    #[serde(default = "default_espn_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EspnConfig {
    fn default() -> Self {
        EspnConfig {
            base_url: default_espn_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_espn_base_url() -> String {
    "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    /// How many league-wide recent picks go into the prompt.
    #[serde(default = "default_recent_picks")]
    pub recent_picks: usize,
}

fn default_recent_picks() -> usize {
    12
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
    /// ESPN `espn_s2` cookie, needed for private leagues.
    pub espn_s2: Option<String>,
    /// ESPN `SWID` cookie, needed for private leagues.
    pub swid: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draftwatch.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- draftwatch.toml (required) ---
    let main_path = config_dir.join("draftwatch.toml");
    let main_text = read_file(&main_path)?;
    let file: ConfigFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league: file.league,
        monitor: file.monitor,
        espn: file.espn,
        llm: file.llm,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Directory the configuration is resolved against.
///
/// The working directory wins when it has `config/` or `defaults/`;
/// otherwise the per-user config directory (e.g. `~/.config/draftwatch`).
pub fn resolve_base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return Ok(cwd);
    }
    match directories::ProjectDirs::from("", "", "draftwatch") {
        Some(dirs) => Ok(dirs.config_dir().to_path_buf()),
        None => Ok(cwd),
    }
}

/// Convenience wrapper: resolves the base directory, copies defaults, loads.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = resolve_base_dir()?;
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.size == Some(0) {
        return Err(invalid("league.size", "must be greater than 0"));
    }

    let monitor = &config.monitor;
    if monitor.poll_interval_secs == 0 {
        return Err(invalid("monitor.poll_interval_secs", "must be greater than 0"));
    }
    if monitor.freshness_secs == 0 {
        return Err(invalid("monitor.freshness_secs", "must be greater than 0"));
    }

    match (monitor.watched_seat, &monitor.watched_team_id) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                "monitor.watched_seat",
                "set either watched_seat or watched_team_id, not both",
            ));
        }
        (None, None) => {
            return Err(invalid(
                "monitor.watched_seat",
                "one of watched_seat or watched_team_id is required",
            ));
        }
        (Some(0), None) => {
            return Err(invalid("monitor.watched_seat", "must be greater than 0"));
        }
        (Some(seat), None) => {
            if let Some(size) = config.league.size {
                if seat > size {
                    return Err(invalid(
                        "monitor.watched_seat",
                        format!("must be within 1..={size}, got {seat}"),
                    ));
                }
            }
        }
        (None, Some(team)) => {
            if team.trim().is_empty() {
                return Err(invalid("monitor.watched_team_id", "must not be empty"));
            }
        }
    }

    if config.espn.base_url.trim().is_empty() {
        return Err(invalid("espn.base_url", "must not be empty"));
    }
    if config.espn.request_timeout_secs == 0 {
        return Err(invalid("espn.request_timeout_secs", "must be greater than 0"));
    }

    if config.llm.max_tokens == 0 {
        return Err(invalid("llm.max_tokens", "must be greater than 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Repository root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        if root.join("defaults").exists() {
            root
        } else {
            panic!("Cannot locate defaults/ directory from {:?}", manifest);
        }
    }

    /// Fresh `<tmp>/<name>/config` directory with the default main config.
    fn scratch_with_defaults(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/draftwatch.toml"),
            tmp.join("config/draftwatch.toml"),
        )
        .unwrap();
        tmp
    }

    fn rewrite_main(tmp: &Path, from: &str, to: &str) {
        let path = tmp.join("config/draftwatch.toml");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "default config should contain `{from}`");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn expect_validation_field(tmp: &Path, expected: &str) {
        match load_config_from(tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = scratch_with_defaults("draftwatch_config_valid");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.league.league_id, 449753582);
        assert_eq!(config.league.season, Some(2025));
        assert_eq!(config.league.size, Some(10));
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.monitor.warning_threshold, 3);
        assert_eq!(config.monitor.watched_seat(), WatchedSeat::Position(1));
        assert_eq!(config.monitor.freshness_window(), Duration::from_secs(300));
        assert_eq!(
            config.espn.base_url,
            "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl"
        );
        assert_eq!(config.llm.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.llm.max_tokens, 500);
        assert_eq!(config.llm.recent_picks, 12);
        assert!(config.credentials.anthropic_api_key.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_keys() {
        let tmp = scratch_with_defaults("draftwatch_config_with_creds");
        fs::write(
            tmp.join("config/credentials.toml"),
            "anthropic_api_key = \"sk-ant-test-key\"\nespn_s2 = \"AEB%2F\"\nswid = \"{ABC-123}\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load with credentials.toml");
        assert_eq!(
            config.credentials.anthropic_api_key.as_deref(),
            Some("sk-ant-test-key")
        );
        assert_eq!(config.credentials.espn_s2.as_deref(), Some("AEB%2F"));
        assert_eq!(config.credentials.swid.as_deref(), Some("{ABC-123}"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let tmp = std::env::temp_dir().join("draftwatch_config_minimal");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(
            tmp.join("config/draftwatch.toml"),
            r#"
[league]
league_id = 1

[monitor]
poll_interval_secs = 5
watched_team_id = "7"

[llm]
model = "test"
max_tokens = 100
"#,
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("minimal config should load");
        assert!(config.league.season.is_none());
        assert!(config.league.season_or_current() >= 2025);
        assert!(config.league.size.is_none());
        assert_eq!(config.monitor.warning_threshold, 3);
        assert_eq!(config.monitor.watched_seat(), WatchedSeat::Team("7".into()));
        assert_eq!(config.espn.request_timeout_secs, 10);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let tmp = scratch_with_defaults("draftwatch_config_zero_poll");
        rewrite_main(&tmp, "poll_interval_secs = 10", "poll_interval_secs = 0");
        expect_validation_field(&tmp, "monitor.poll_interval_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_league_size() {
        let tmp = scratch_with_defaults("draftwatch_config_zero_size");
        rewrite_main(&tmp, "size = 10", "size = 0");
        expect_validation_field(&tmp, "league.size");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_seat_beyond_league_size() {
        let tmp = scratch_with_defaults("draftwatch_config_seat_range");
        rewrite_main(&tmp, "watched_seat = 1", "watched_seat = 11");
        expect_validation_field(&tmp, "monitor.watched_seat");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_both_seat_selectors() {
        let tmp = scratch_with_defaults("draftwatch_config_both_seats");
        rewrite_main(&tmp, "watched_seat = 1", "watched_seat = 1\nwatched_team_id = \"4\"");
        expect_validation_field(&tmp, "monitor.watched_seat");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_missing_seat_selector() {
        let tmp = scratch_with_defaults("draftwatch_config_no_seat");
        rewrite_main(&tmp, "watched_seat = 1", "");
        expect_validation_field(&tmp, "monitor.watched_seat");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let tmp = scratch_with_defaults("draftwatch_config_zero_tokens");
        rewrite_main(&tmp, "max_tokens = 500", "max_tokens = 0");
        expect_validation_field(&tmp, "llm.max_tokens");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_main_config() {
        let tmp = std::env::temp_dir().join("draftwatch_config_missing_main");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("draftwatch.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = std::env::temp_dir().join("draftwatch_config_invalid_toml");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/draftwatch.toml"), "this is not valid [[[ toml").unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("draftwatch.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("draftwatch_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            project_root().join("defaults/draftwatch.toml"),
            defaults_dir.join("draftwatch.toml"),
        )
        .unwrap();
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "anthropic_api_key = \"sk-ant-...\"\n",
        )
        .unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/draftwatch.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("draftwatch_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/draftwatch.toml"),
            tmp.join("defaults/draftwatch.toml"),
        )
        .unwrap();
        fs::write(tmp.join("config/draftwatch.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());
        let content = fs::read_to_string(tmp.join("config/draftwatch.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("draftwatch_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
