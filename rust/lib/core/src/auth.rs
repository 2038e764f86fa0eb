//! Viewer identity resolution.
//!
//! Business modules never read a global session. Each request resolves
//! its viewer through this trait and passes the id down explicitly.
//! The concrete implementation is injected at startup time.

use axum::http::HeaderMap;

use crate::ServiceError;

/// Header set by the upstream auth proxy for authenticated requests.
pub const VIEWER_HEADER: &str = "x-viewer-id";

/// Pluggable authenticator.
pub trait Authenticator: Send + Sync + 'static {
    /// Resolve the viewer behind a request.
    ///
    /// - `Ok(Some(id))`: an authenticated principal
    /// - `Ok(None)`: anonymous
    /// - `Err(_)`: credentials were present but unusable
    fn viewer(&self, headers: &HeaderMap) -> Result<Option<String>, ServiceError>;
}

/// Trusts a header injected by a fronting proxy that already verified
/// the session.
pub struct TrustedHeader {
    header: String,
}

impl TrustedHeader {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }
}

impl Default for TrustedHeader {
    fn default() -> Self {
        Self::new(VIEWER_HEADER)
    }
}

impl Authenticator for TrustedHeader {
    fn viewer(&self, headers: &HeaderMap) -> Result<Option<String>, ServiceError> {
        let Some(raw) = headers.get(self.header.as_str()) else {
            return Ok(None);
        };
        let id = raw
            .to_str()
            .map_err(|_| ServiceError::Unauthorized(format!("malformed {} header", self.header)))?
            .trim();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    }
}

/// Treats every request as anonymous. Used for testing and read-only
/// public deployments.
pub struct Anonymous;

impl Authenticator for Anonymous {
    fn viewer(&self, _headers: &HeaderMap) -> Result<Option<String>, ServiceError> {
        Ok(None)
    }
}
