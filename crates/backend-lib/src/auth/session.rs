// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! In-memory session store.
//!
//! Two maps live behind a single mutex: session token to [`Uid`], and
//! [`Uid`] to [`User`]. A user may hold any number of live tokens (one per
//! device). Each issued token is purged by its own timer task once its
//! lifetime has elapsed; lookups also compare against the expiry instant so a
//! token is never honoured past its lifetime, even if the purge is late.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use taskcollect_common::{Uid, User};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use super::token_generator::generate_secure_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Default session lifetime (3 days)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 3);

/// Longest lifetime a store will hand out (365 days)
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no matching session")]
    NoSession,
}

/// A freshly issued session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    /// Wall-clock expiry, used for the cookie
    pub expires: DateTime<Utc>,
}

#[derive(Debug)]
struct TokenEntry {
    uid: Uid,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    tokens: HashMap<String, TokenEntry>,
    users: HashMap<Uid, User>,
}

impl Inner {
    /// Remove `token` if it has expired by `now`. Returns whether it was removed.
    fn purge(&mut self, token: &str, now: Instant) -> bool {
        match self.tokens.get(token) {
            Some(entry) if entry.expires_at <= now => {
                self.tokens.remove(token);
                true
            },
            _ => false,
        }
    }
}

/// Shared session store
#[derive(Clone, Debug)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    /// Create a store issuing sessions of `ttl`, capped at [`MAX_SESSION_TTL`]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `user` and bind a new session token to it.
    ///
    /// Spawns the token's expiry timer, so this must be called from within a
    /// tokio runtime.
    pub fn issue(&self, user: User) -> SessionToken {
        let token = generate_secure_token();
        let uid = user.uid();
        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or(now);
        let expires = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or_else(Utc::now);

        let active = {
            let mut inner = self.inner.lock();
            inner.tokens.insert(token.clone(), TokenEntry { uid, expires_at });
            inner.users.insert(user.uid(), user);
            inner.tokens.len()
        };

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(active as f64);

        let inner = Arc::clone(&self.inner);
        let expiring = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let (removed, active) = {
                let mut inner = inner.lock();
                let removed = inner.purge(&expiring, Instant::now());
                (removed, inner.tokens.len())
            };
            if removed {
                debug!("session expired");
                counter!(SESSION_EXPIRED).increment(1);
                gauge!(SESSION_ACTIVE).set(active as f64);
            }
        });

        SessionToken { token, expires }
    }

    /// Look up the user bound to `token`
    pub fn resolve(&self, token: &str) -> Result<User, SessionError> {
        let inner = self.inner.lock();
        let entry = inner.tokens.get(token).ok_or(SessionError::NoSession)?;
        if entry.expires_at <= Instant::now() {
            return Err(SessionError::NoSession);
        }
        inner.users.get(&entry.uid).cloned().ok_or(SessionError::NoSession)
    }

    /// Merge a refreshed identity into the record stored for `user.uid()`.
    ///
    /// Site tokens carried by `user` overwrite the stored ones; platforms it
    /// does not mention keep whatever the store holds at the time of the call,
    /// including tokens written by other sessions since `user` was read. The
    /// remaining fields are taken from `user`. Returns the merged record.
    ///
    /// If `token` names a live session it is rebound to that uid. An unknown
    /// or expired token is not brought back to life.
    pub fn update(&self, token: &str, mut user: User) -> User {
        let uid = user.uid();
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if !token.is_empty() {
            if let Some(entry) = inner.tokens.get_mut(token) {
                if entry.expires_at > now {
                    entry.uid = uid.clone();
                }
            }
        }
        if let Some(stored) = inner.users.remove(&uid) {
            for (platform, site_token) in stored.site_tokens {
                user.site_tokens.entry(platform).or_insert(site_token);
            }
        }
        inner.users.insert(uid, user.clone());
        user
    }

    /// Invalidate `token`. Logging out an unknown token is not an error.
    pub fn logout(&self, token: &str) {
        let active = {
            let mut inner = self.inner.lock();
            inner.tokens.remove(token);
            inner.tokens.len()
        };
        gauge!(SESSION_ACTIVE).set(active as f64);
    }

    /// Stored identity for `uid`, whether or not it has a live session
    pub fn lookup(&self, uid: &Uid) -> Option<User> {
        self.inner.lock().users.get(uid).cloned()
    }

    /// Number of unexpired session tokens
    pub fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .tokens
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> User {
        User {
            school: "example".to_string(),
            username: username.to_string(),
            password: "hunter2".to_string(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let store = SessionStore::default();
        let session = store.issue(user("alice"));

        let resolved = store.resolve(&session.token).unwrap();
        assert_eq!(resolved.username, "alice");
        assert_eq!(store.active_sessions(), 1);
        assert!(session.expires > Utc::now() + chrono::Duration::days(2));
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_session() {
        let store = SessionStore::default();
        assert_eq!(store.resolve("bogus"), Err(SessionError::NoSession));
        assert_eq!(store.resolve(""), Err(SessionError::NoSession));
    }

    #[tokio::test]
    async fn test_tokens_are_unique_per_login() {
        let store = SessionStore::default();
        let first = store.issue(user("alice"));
        let second = store.issue(user("alice"));

        assert_ne!(first.token, second.token);
        assert!(store.resolve(&first.token).is_ok());
        assert!(store.resolve(&second.token).is_ok());
        assert_eq!(store.active_sessions(), 2);
    }

    #[tokio::test]
    async fn test_double_logout_is_idempotent() {
        let store = SessionStore::default();
        let session = store.issue(user("alice"));

        store.logout(&session.token);
        assert_eq!(store.resolve(&session.token), Err(SessionError::NoSession));

        store.logout(&session.token);
        assert_eq!(store.resolve(&session.token), Err(SessionError::NoSession));
        assert_eq!(store.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_logout_keeps_other_devices() {
        let store = SessionStore::default();
        let laptop = store.issue(user("alice"));
        let phone = store.issue(user("alice"));

        store.logout(&laptop.token);
        assert!(store.resolve(&laptop.token).is_err());
        assert!(store.resolve(&phone.token).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_after_ttl() {
        let store = SessionStore::default();
        let session = store.issue(user("alice"));

        tokio::time::advance(Duration::from_secs(60 * 60 * (24 * 2 + 23))).await;
        assert!(store.resolve(&session.token).is_ok());

        tokio::time::advance(Duration::from_secs(60 * 60 + 1)).await;
        assert_eq!(store.resolve(&session.token), Err(SessionError::NoSession));

        // let the purge timer run
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.active_sessions(), 0);
        assert!(store.inner.lock().tokens.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_keeps_identity() {
        let store = SessionStore::new(Duration::from_secs(60));
        let alice = user("alice");
        let session = store.issue(alice.clone());

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(store.resolve(&session.token).is_err());
        assert_eq!(store.lookup(&alice.uid()).unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_update_replaces_identity() {
        let store = SessionStore::default();
        let session = store.issue(user("alice"));

        let mut refreshed = user("alice");
        refreshed.site_tokens.insert("example".to_string(), "fresh".to_string());
        store.update(&session.token, refreshed);

        let resolved = store.resolve(&session.token).unwrap();
        assert_eq!(resolved.site_token("example"), Some("fresh"));
    }

    #[tokio::test]
    async fn test_update_keeps_tokens_it_does_not_mention() {
        let store = SessionStore::default();
        let mut alice = user("alice");
        alice.site_tokens.insert("daymap".to_string(), "daymap-old".to_string());
        alice.site_tokens.insert("gclass".to_string(), "gclass-old".to_string());
        let laptop = store.issue(alice.clone());

        // another device refreshes gclass in the meantime
        let mut phone = alice.clone();
        phone.site_tokens.insert("gclass".to_string(), "gclass-phone".to_string());
        store.issue(phone);

        let mut refreshed = user("alice");
        refreshed.site_tokens.insert("daymap".to_string(), "daymap-new".to_string());
        let merged = store.update(&laptop.token, refreshed);

        assert_eq!(merged.site_token("daymap"), Some("daymap-new"));
        assert_eq!(merged.site_token("gclass"), Some("gclass-phone"));
        assert_eq!(store.resolve(&laptop.token).unwrap(), merged);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_capped() {
        let store = SessionStore::new(Duration::from_secs(u64::MAX / 2));
        assert_eq!(store.ttl(), MAX_SESSION_TTL);

        let session = store.issue(user("alice"));
        assert!(store.resolve(&session.token).is_ok());
        assert!(session.expires > Utc::now() + chrono::Duration::days(364));
    }

    #[tokio::test]
    async fn test_update_does_not_revive_logged_out_token() {
        let store = SessionStore::default();
        let session = store.issue(user("alice"));
        store.logout(&session.token);

        store.update(&session.token, user("alice"));
        assert!(store.resolve(&session.token).is_err());
        assert!(store.lookup(&user("alice").uid()).is_some());
    }
}
