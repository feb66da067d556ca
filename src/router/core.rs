use crate::error::RequestError;
use crate::spec::{OpenApiDocument, Operation, PathEntry};
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the match path.
///
/// Names are `Arc<str>` shared with the compiled [`RelativePath`](crate::spec::RelativePath);
/// values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request to an operation.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched path table entry.
    pub entry: &'a PathEntry,
    /// The operation selected for the request method.
    pub operation: &'a Operation,
    /// Path variables extracted from the URL (e.g., `{id}` → `"123"`).
    pub path_params: ParamVec,
}

impl RouteMatch<'_> {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics when a template repeats a name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.operation.meta.handler_name
    }

    #[must_use]
    pub fn route_pattern(&self) -> &str {
        self.entry.path.as_str()
    }
}

/// Matches requests against the path table of a generated document.
///
/// The router only reads the document; one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Router {
    document: Arc<OpenApiDocument>,
}

impl Router {
    #[must_use]
    pub fn new(document: Arc<OpenApiDocument>) -> Self {
        let routes_summary: Vec<String> = document
            .operations()
            .take(10)
            .map(|(path, method, op)| format!("{method} {path} -> {}", op.meta.handler_name))
            .collect();
        info!(
            paths_count = document.paths.len(),
            routes_count = document.operations().count(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
        Self { document }
    }

    #[must_use]
    pub fn document(&self) -> &Arc<OpenApiDocument> {
        &self.document
    }

    /// One line per operation, in match order.
    #[must_use]
    pub fn route_summaries(&self) -> Vec<String> {
        self.document
            .operations()
            .map(|(path, method, op)| format!("{method} {path} -> {}", op.meta.handler_name))
            .collect()
    }

    /// Match a request path and method.
    ///
    /// # Errors
    ///
    /// * [`RequestError::NotFound`] when no template matches the path
    /// * [`RequestError::MethodNotAllowed`] when the path matches but the
    ///   method has no operation
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RequestError> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let Some((entry, path_params)) = self.document.paths.match_path(path) else {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_start.elapsed().as_micros(),
                "No route matched"
            );
            return Err(RequestError::NotFound);
        };

        let Some(operation) = entry.item.operation(method) else {
            warn!(
                method = %method,
                path = %path,
                route_pattern = %entry.path,
                "Method not allowed for matched route"
            );
            return Err(RequestError::MethodNotAllowed);
        };

        let match_duration = match_start.elapsed();
        if match_duration > Duration::from_millis(1) {
            warn!(
                method = %method,
                path = %path,
                handler_name = %operation.meta.handler_name,
                route_pattern = %entry.path,
                path_params = ?path_params,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                method = %method,
                path = %path,
                handler_name = %operation.meta.handler_name,
                route_pattern = %entry.path,
                path_params = ?path_params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            );
        }

        Ok(RouteMatch {
            entry,
            operation,
            path_params,
        })
    }
}
