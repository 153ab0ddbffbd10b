//! Application-level configuration loading: match policy knobs shared by the services.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCHDAY_BACK_CONFIG_PATH";
/// Match length used when a match does not carry its own duration.
const DEFAULT_MATCH_DURATION_MINUTES: u64 = 120;
/// Re-read/re-decide rounds a mutation gets when its guard keeps failing.
const DEFAULT_MUTATION_RETRY_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    match_duration: Duration,
    mutation_retry_limit: u32,
    promote_on_leave: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        match_duration_minutes = app_config.match_duration.as_secs() / 60,
                        mutation_retry_limit = app_config.mutation_retry_limit,
                        promote_on_leave = app_config.promote_on_leave,
                        "loaded match policy from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Duration applied to matches without a per-match override.
    pub fn match_duration(&self) -> Duration {
        self.match_duration
    }

    /// How many times a guarded mutation re-reads and retries before giving up.
    pub fn mutation_retry_limit(&self) -> u32 {
        self.mutation_retry_limit
    }

    /// Whether a successful leave immediately runs the queue processor.
    pub fn promote_on_leave(&self) -> bool {
        self.promote_on_leave
    }

    /// Override the default match duration.
    pub fn with_match_duration(mut self, duration: Duration) -> Self {
        self.match_duration = duration;
        self
    }

    /// Enable or disable promotion right after a leave.
    pub fn with_promote_on_leave(mut self, enabled: bool) -> Self {
        self.promote_on_leave = enabled;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            match_duration: Duration::from_secs(DEFAULT_MATCH_DURATION_MINUTES * 60),
            mutation_retry_limit: DEFAULT_MUTATION_RETRY_LIMIT,
            promote_on_leave: true,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    match_duration_minutes: Option<u64>,
    #[serde(default)]
    mutation_retry_limit: Option<u32>,
    #[serde(default)]
    promote_on_leave: Option<bool>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            match_duration: value
                .match_duration_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(defaults.match_duration),
            mutation_retry_limit: value
                .mutation_retry_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.mutation_retry_limit),
            promote_on_leave: value.promote_on_leave.unwrap_or(defaults.promote_on_leave),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
