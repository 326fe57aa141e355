// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the TaskCollect server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod platform;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use tracing::warn;

use crate::auth::AuthRateLimiter;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::platform::example;
use crate::storage::FlatFileConfigSource;

pub use crate::router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// School registry and sessions
    pub orchestrator: Arc<Orchestrator>,
    /// Failed-login throttling
    pub login_limiter: AuthRateLimiter,
}

impl AppState {
    /// Create the application state around a fully enrolled orchestrator
    pub fn new(orchestrator: Orchestrator) -> Self {
        let login_limiter = AuthRateLimiter::from_settings(&orchestrator.settings().rate_limit);
        Self {
            orchestrator: Arc::new(orchestrator),
            login_limiter,
        }
    }

    /// Create the application state with every enabled school that has
    /// platforms available, reading user configuration from
    /// `settings.user_config_dir`.
    pub fn from_settings(settings: Settings) -> Self {
        let user_configs = Arc::new(FlatFileConfigSource::new(&settings.user_config_dir));
        let settings = Arc::new(settings);
        let mut orchestrator = Orchestrator::new(Arc::clone(&settings), user_configs);

        for (school, rules) in &settings.schools {
            if !rules.enabled {
                continue;
            }
            match school.as_str() {
                example::NAME => {
                    orchestrator.enrol(school.clone(), example::mux());
                },
                _ => warn!(%school, "no platforms available, school not enrolled"),
            }
        }

        Self::new(orchestrator)
    }
}
