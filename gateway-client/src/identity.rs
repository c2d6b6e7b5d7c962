//! Caller identity propagation.
//!
//! The gateway trusts a configured header to name the already-authenticated
//! caller. Nothing is signed or verified here; trust is network-level.

use crate::error::{GatewayError, GatewayResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

/// Default name of the identity header.
pub const DEFAULT_IDENTITY_HEADER: &str = "X-Authenticated-User";

/// Builds outbound header sets carrying the caller identity.
#[derive(Debug, Clone)]
pub struct IdentityPropagator {
    header_name: HeaderName,
}

impl IdentityPropagator {
    /// Create a propagator using `header_name`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the name is not a legal header name.
    pub fn new(header_name: &str) -> GatewayResult<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| GatewayError::config(format!("Invalid identity header name: {header_name:?}")))?;
        Ok(Self { header_name })
    }

    /// Name of the identity header.
    #[must_use]
    pub const fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Headers for a JSON request on behalf of `identity`.
    ///
    /// An absent or blank identity omits the identity header entirely. Any
    /// other value is sent exactly as given.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the identity contains
    /// characters not allowed in a header value.
    pub fn headers(&self, identity: Option<&str>) -> GatewayResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(id) = identity.filter(|id| !id.trim().is_empty()) {
            let value = HeaderValue::from_str(id).map_err(|_| {
                GatewayError::invalid_request("Caller identity is not a valid header value")
            })?;
            headers.insert(self.header_name.clone(), value);
        }

        Ok(headers)
    }
}

impl Default for IdentityPropagator {
    fn default() -> Self {
        Self {
            header_name: HeaderName::from_static("x-authenticated-user"),
        }
    }
}
