// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod data;
pub mod session;
pub mod work;

/// Liveness probe
pub async fn health() -> &'static str {
    "ok"
}
