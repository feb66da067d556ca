//! Error taxonomy.
//!
//! Errors fall into two families that never mix:
//!
//! - [`GenerateError`] aborts document generation. It is raised once at
//!   startup and is never turned into an HTTP response.
//! - [`RequestError`] describes a problem with a single incoming request. The
//!   [`RequestHandler`](crate::dispatcher::RequestHandler) always converts it
//!   into an `application/problem+json` response.
//!
//! [`DispatchError`] is the fatal per-request case: a misconfigured router
//! (missing authentication provider, unbound handler, unsupported result, or a
//! response the HTTP layer rejects). It escapes `handle` as `Err` because no
//! well-formed response can describe it.

use crate::schema::Issue;
use http::{Method, StatusCode};
use thiserror::Error;

/// Configuration defects detected while building an [`OpenApiDocument`](crate::spec::OpenApiDocument).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Two path templates cannot be told apart at match time.
    #[error("the path \"{path}\" is ambiguous with the already registered path \"{existing}\"")]
    AmbiguousPath { path: String, existing: String },

    /// Two handlers claim the same (path, method) pair.
    #[error("the path \"{path}\" is duplicated for HTTP method \"{method}\" (handlers \"{first}\" and \"{second}\")")]
    DuplicateOperation {
        path: String,
        method: Method,
        first: String,
        second: String,
    },

    #[error("invalid path template \"{path}\": {reason}")]
    InvalidPathTemplate { path: String, reason: String },

    #[error("invalid parameter \"{name}\": {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid security requirement: {0}")]
    InvalidSecurityRequirement(String),

    #[error("invalid security scheme \"{name}\": {reason}")]
    InvalidSecurityScheme { name: String, reason: String },

    /// Handler definitions that contradict each other or the operation.
    #[error("handler \"{handler}\": {message}")]
    Misconfiguration { handler: String, message: String },
}

impl GenerateError {
    pub(crate) fn misconfigured(handler: &str, message: impl Into<String>) -> Self {
        GenerateError::Misconfiguration {
            handler: handler.to_string(),
            message: message.into(),
        }
    }
}

/// A request that cannot be served. Always rendered as a problem response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Bad Request: {detail}")]
    BadRequest { detail: String, issues: Vec<Issue> },

    #[error("Unauthorized: {detail}")]
    Unauthorized { detail: String },

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl RequestError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        RequestError::BadRequest {
            detail: detail.into(),
            issues: Vec::new(),
        }
    }

    /// A 400 carrying structured coercion issues and no free-form detail.
    pub fn invalid(issues: Vec<Issue>) -> Self {
        RequestError::BadRequest {
            detail: String::new(),
            issues,
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        RequestError::Unauthorized {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::NotFound => StatusCode::NOT_FOUND,
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Human readable detail, empty when the status says it all.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            RequestError::BadRequest { detail, .. } | RequestError::Unauthorized { detail } => {
                detail
            }
            RequestError::NotFound | RequestError::MethodNotAllowed => "",
        }
    }

    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        match self {
            RequestError::BadRequest { issues, .. } => issues,
            _ => &[],
        }
    }
}

/// Unrecoverable router misconfiguration surfaced while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("operation \"{handler}\" requires authentication, but no authentication context provider is configured")]
    MissingAuthenticationProvider { handler: String },

    #[error("no handler function is bound for operation \"{handler}\"")]
    UnboundHandler { handler: String },

    #[error("the result of handler \"{handler}\" is not supported: {reason}")]
    UnsupportedResult { handler: String, reason: String },

    /// The rendered response was rejected by the HTTP layer (e.g. an invalid header name).
    #[error("the response of handler \"{handler}\" cannot be rendered: {reason}")]
    InvalidResponse { handler: String, reason: String },
}
