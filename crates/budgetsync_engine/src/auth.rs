//! Authentication bootstrap abstraction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Answers whether the remote store may be used right now.
///
/// The engine asks before every remote operation. A `false` answer makes
/// the operation return a local-only outcome instead of an error.
pub trait Authenticator: Send + Sync {
    /// Ensures a session exists, returning false if none can be had.
    fn ensure_authenticated(&self) -> bool;
}

impl<A: Authenticator + ?Sized> Authenticator for Arc<A> {
    fn ensure_authenticated(&self) -> bool {
        (**self).ensure_authenticated()
    }
}

/// An authenticator with a fixed, switchable answer.
#[derive(Debug)]
pub struct StaticAuthenticator {
    authenticated: AtomicBool,
    checks: AtomicU64,
}

impl StaticAuthenticator {
    /// Creates an authenticator answering `authenticated`.
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
            checks: AtomicU64::new(0),
        }
    }

    /// An authenticator that always succeeds.
    pub fn authenticated() -> Self {
        Self::new(true)
    }

    /// An authenticator that always fails.
    pub fn unauthenticated() -> Self {
        Self::new(false)
    }

    /// Changes the answer.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    /// Number of times the engine asked.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::SeqCst)
    }
}

impl Default for StaticAuthenticator {
    fn default() -> Self {
        Self::authenticated()
    }
}

impl Authenticator for StaticAuthenticator {
    fn ensure_authenticated(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.authenticated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_authenticator_toggles() {
        let auth = StaticAuthenticator::authenticated();
        assert!(auth.ensure_authenticated());
        auth.set_authenticated(false);
        assert!(!auth.ensure_authenticated());
        assert_eq!(auth.checks(), 2);
    }

    #[test]
    fn arc_forwards() {
        let auth: Arc<dyn Authenticator> = Arc::new(StaticAuthenticator::unauthenticated());
        assert!(!auth.ensure_authenticated());
    }
}
