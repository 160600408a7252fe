//! Bearer credentials supplied by the surrounding auth subsystem.
//!
//! The client only reads the token. Obtaining, refreshing and expiring it is
//! the identity provider's business.

use std::fmt;

use crate::error::ApiError;

/// Opaque holder of an access token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
        }
    }

    /// A session with no credential. Every request made with it fails locally.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    /// The `Authorization` header value, or a `LocalFault` when there is no token.
    pub fn bearer(&self) -> Result<String, ApiError> {
        self.token()
            .map(|token| format!("Bearer {token}"))
            .ok_or_else(|| ApiError::local("session has no access token"))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.token().map(|_| "<redacted>"))
            .finish()
    }
}
