//! # Security Module
//!
//! Authentication for operations with an effective [`SecurityRequirement`].
//!
//! ## Flow
//!
//! 1. the dispatcher resolves the operation's requirement (its own, else the
//!    document default)
//! 2. the configured [`AuthenticationContextProvider`] inspects the request
//! 3. a returned [`AuthenticationContext`] is handed to the handler through the
//!    argument declared with
//!    [`ArgumentDefinition::authentication`](crate::generator::ArgumentDefinition::authentication)
//! 4. no context and no anonymous alternative means `401 Unauthorized`
//!
//! ## Example
//!
//! ```rust
//! use typedapi::security::{AuthenticationContext, AuthenticationContextProvider};
//! use typedapi::server::IncomingRequest;
//! use typedapi::spec::SecurityRequirement;
//! use typedapi::RequestError;
//!
//! struct HeaderProvider;
//!
//! impl AuthenticationContextProvider for HeaderProvider {
//!     fn authenticate(
//!         &self,
//!         request: &IncomingRequest<'_>,
//!         _requirement: &SecurityRequirement,
//!     ) -> Result<Option<AuthenticationContext>, RequestError> {
//!         Ok(request
//!             .header("x-user")
//!             .map(|user| AuthenticationContext::new("userHeader", user)))
//!     }
//! }
//! ```

mod static_credentials;

pub use static_credentials::{Credential, StaticCredentialsProvider};

use crate::error::RequestError;
use crate::server::IncomingRequest;
use crate::spec::SecurityRequirement;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The authenticated principal of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    /// Name of the security scheme that authenticated the request.
    pub scheme: String,
    pub subject: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub claims: Value,
}

impl AuthenticationContext {
    pub fn new(scheme: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            subject: subject.into(),
            scopes: Vec::new(),
            claims: Value::Null,
        }
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = claims;
        self
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Resolves the principal of a request against a requirement.
///
/// Return `Ok(None)` when no alternative is satisfied; the dispatcher decides
/// between anonymous access and `401`. Return `Err` to reject the request with
/// a specific problem.
pub trait AuthenticationContextProvider: Send + Sync {
    fn authenticate(
        &self,
        request: &IncomingRequest<'_>,
        requirement: &SecurityRequirement,
    ) -> Result<Option<AuthenticationContext>, RequestError>;
}
