// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const SESSION_ACTIVE: &str = "session.active";
pub const LOGIN_FAILED: &str = "login.failed";
pub const LOGIN_THROTTLED: &str = "login.throttled";
pub const DISPATCH_FAILURES: &str = "dispatch.failures";
