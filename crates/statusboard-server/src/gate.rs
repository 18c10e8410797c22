//! Shared-password gate
//!
//! Access is an explicit per-request [`AccessContext`] (the session cookie,
//! if any) checked against a [`SessionStore`]. The password check itself is
//! a pure function of the submitted and configured values.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "statusboard_session";

/// How long a granted session stays valid
pub const SESSION_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

/// Compare a submitted password with the configured one
///
/// Compares SHA-256 digests without early exit. An empty secret never
/// matches.
#[must_use]
pub fn check_password(submitted: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let a = Sha256::digest(submitted.as_bytes());
    let b = Sha256::digest(secret.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// What a request brings to the gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessContext {
    session: Option<Uuid>,
}

impl AccessContext {
    /// Context from an optional cookie value; unparsable ids are ignored
    #[must_use]
    pub fn from_cookie(cookie: Option<&str>) -> Self {
        Self {
            session: cookie.and_then(|c| Uuid::parse_str(c.trim()).ok()),
        }
    }

    /// Session id, if the request carried a well-formed one
    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<Uuid> {
        self.session
    }
}

/// Granted sessions
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Instant>>,
    lifetime: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_lifetime(SESSION_LIFETIME)
    }
}

impl SessionStore {
    /// Create store with a session lifetime
    #[must_use]
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            lifetime,
        }
    }

    /// Session lifetime
    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Grant a new session
    pub fn grant(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.lock();
        let lifetime = self.lifetime;
        sessions.retain(|_, granted| granted.elapsed() < lifetime);
        sessions.insert(id, Instant::now());
        info!(active = sessions.len(), "session granted");
        id
    }

    /// True if the context carries a live session
    #[must_use]
    pub fn is_granted(&self, ctx: &AccessContext) -> bool {
        let Some(id) = ctx.session() else {
            return false;
        };
        let mut sessions = self.sessions.lock();
        match sessions.get(&id) {
            Some(granted) if granted.elapsed() < self.lifetime => true,
            Some(_) => {
                sessions.remove(&id);
                debug!("session expired");
                false
            }
            None => false,
        }
    }

    /// Drop the context's session
    pub fn revoke(&self, ctx: &AccessContext) {
        if let Some(id) = ctx.session() {
            self.sessions.lock().remove(&id);
        }
    }

    /// Number of stored sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// True if no sessions are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
