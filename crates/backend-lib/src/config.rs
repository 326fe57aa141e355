// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then a TOML file,
//! then `TASKCOLLECT_*` environment variables (nested keys separated by
//! `__`, e.g. `TASKCOLLECT_RATE_LIMIT__MAX_ATTEMPTS`).
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::MAX_SESSION_TTL;
use crate::error::AppError;
use crate::validation::validate_school;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "TASKCOLLECT_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Session lifetime in seconds, at most 365 days
    pub session_ttl_secs: u64,
    /// Take the client address from `X-Real-IP` instead of the socket peer.
    /// Only enable behind a reverse proxy that sets the header.
    pub trust_proxy_headers: bool,
    /// Directory holding per-user platform configuration files
    pub user_config_dir: PathBuf,
    /// Per-school login normalization, keyed by school id
    pub schools: HashMap<String, SchoolSettings>,
    pub rate_limit: RateLimitSettings,
}

/// Login normalization rules for one school
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolSettings {
    pub enabled: bool,
    /// Prepended to usernames that do not already start with it (case-insensitive)
    pub username_prefix: Option<String>,
    pub uppercase_username: bool,
    /// Removed from the start of display names returned by platforms
    pub display_name_strip_prefix: Option<String>,
    /// IANA timezone name assigned to users of this school
    pub timezone: Option<String>,
}

/// Failed-login throttling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Failed logins before an address is locked out
    pub max_attempts: u32,
    /// Lockout length in seconds
    pub lockout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let mut schools = HashMap::new();
        schools.insert(
            "example".to_string(),
            SchoolSettings {
                enabled: true,
                ..SchoolSettings::default()
            },
        );

        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 3, // 3 days
            trust_proxy_headers: false,
            user_config_dir: PathBuf::from("config/users"),
            schools,
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` in the working directory and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from the TOML file at `path` and the environment.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let settings: Settings = Self::figment(path.as_ref())
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!("invalid log level: {}", self.log_level)));
        }
        if self.session_ttl_secs == 0 {
            return Err(AppError::Config("session_ttl_secs must be positive".to_string()));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL.as_secs() {
            return Err(AppError::Config(format!(
                "session_ttl_secs must not exceed {}",
                MAX_SESSION_TTL.as_secs()
            )));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(AppError::Config("rate_limit.max_attempts must be positive".to_string()));
        }
        for (id, school) in &self.schools {
            validate_school(id).map_err(|e| AppError::Config(format!("school {id:?}: {e}")))?;
            if school.username_prefix.as_deref() == Some("") {
                return Err(AppError::Config(format!("school {id:?}: empty username_prefix")));
            }
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Normalization rules for `school`, if it is configured and enabled
    pub fn school(&self, school: &str) -> Option<&SchoolSettings> {
        self.schools.get(school).filter(|s| s.enabled)
    }
}

#[cfg(test)]
mod config_tests;
