//! Session context injected into the transport

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Signed-in user as known to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// Access to the current session, passed to the transport instead of being
/// read from global storage
#[cfg_attr(test, mockall::automock)]
pub trait SessionContext: Send + Sync {
    /// Bearer token for requests, if signed in
    fn token(&self) -> Option<String>;

    /// The signed-in user, if any
    fn current_user(&self) -> Option<SessionUser>;

    /// Called when the backend rejects the token
    fn on_unauthorized(&self);
}

/// Session kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
    user: RwLock<Option<SessionUser>>,
}

impl InMemorySession {
    pub fn new(token: Option<String>, user: Option<SessionUser>) -> Self {
        Self {
            token: RwLock::new(token),
            user: RwLock::new(user),
        }
    }

    /// Sign in with a token and user
    pub fn sign_in(&self, token: String, user: SessionUser) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    /// Drop token and user
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl SessionContext for InMemorySession {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn current_user(&self) -> Option<SessionUser> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn on_unauthorized(&self) {
        tracing::warn!("Backend rejected the session token, signing out");
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nurse() -> SessionUser {
        SessionUser {
            id: "u-7".to_string(),
            username: "amina".to_string(),
            role: "Nurse".to_string(),
        }
    }

    #[test]
    fn test_default_is_signed_out() {
        let session = InMemorySession::default();
        assert!(session.token().is_none());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_sign_in_then_unauthorized_clears() {
        let session = InMemorySession::default();
        session.sign_in("tok".to_string(), nurse());
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(session.current_user(), Some(nurse()));

        session.on_unauthorized();
        assert!(session.token().is_none());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_new_with_token_only() {
        let session = InMemorySession::new(Some("abc".to_string()), None);
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert!(session.current_user().is_none());
    }
}
