// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the TaskCollect HTTP server.

pub mod client_ip;
pub mod session;

pub use client_ip::{client_ip, ClientIp};
pub use session::{require_session, CurrentSession};
