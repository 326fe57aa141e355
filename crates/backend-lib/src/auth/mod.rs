// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Session tokens, the in-memory session store and login throttling.

pub mod cookie;
pub mod rate_limit;
pub mod session;
pub mod token_generator;

pub use cookie::{clear_cookie, extract_token, session_cookie, COOKIE_NAME};
pub use rate_limit::AuthRateLimiter;
pub use session::{SessionError, SessionStore, SessionToken, DEFAULT_SESSION_TTL, MAX_SESSION_TTL};
pub use token_generator::generate_secure_token;
