use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default reminder ladder: minutes before a call's start time.
/// Must stay in descending order — the engine relies on it.
pub const DEFAULT_OFFSETS_MINUTES: [i64; 5] = [15, 10, 5, 1, 0];

/// Default poll cadence. Any value at or below the smallest gap between
/// consecutive ladder offsets (1 minute for the default ladder) keeps
/// exact-match firing correct.
pub const DEFAULT_POLL_SECS: u64 = 60;

/// Top-level config (switchboard.toml + SWITCHBOARD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Reminder-engine settings shared by every viewer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Minutes-before-start ladder, descending. `0` means "starting now".
    #[serde(default = "default_offsets")]
    pub offsets_minutes: Vec<i64>,
    /// Seconds between engine evaluation passes.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            offsets_minutes: default_offsets(),
            poll_secs: default_poll_secs(),
        }
    }
}

impl NotifyConfig {
    /// The ladder with duplicates removed, sorted descending.
    ///
    /// Config files may list offsets in any order; the engine wants the
    /// largest offset first so the "most recent missed offset" scan is a
    /// single pass.
    pub fn ladder(&self) -> Vec<i64> {
        let mut ladder: Vec<i64> = self
            .offsets_minutes
            .iter()
            .copied()
            .filter(|o| *o >= 0)
            .collect();
        ladder.sort_unstable_by(|a, b| b.cmp(a));
        ladder.dedup();
        ladder
    }
}

impl SwitchboardConfig {
    /// Load config from `config_path` (or the default location) merged
    /// with `SWITCHBOARD_*` environment overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SwitchboardConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SWITCHBOARD_").split("_"))
            .extract()
            .map_err(|e| crate::error::SwitchboardError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.switchboard/switchboard.toml", home)
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.switchboard/switchboard.db", home)
}

fn default_offsets() -> Vec<i64> {
    DEFAULT_OFFSETS_MINUTES.to_vec()
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_SECS
}
