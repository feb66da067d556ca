//! # Router Module
//!
//! Matches incoming requests against the path table of a generated
//! [`OpenApiDocument`](crate::spec::OpenApiDocument).
//!
//! ## Compile vs match
//!
//! Path templates are compiled into anchored, case-insensitive regexes once,
//! when the document is generated. The router itself holds no state besides
//! an `Arc` of that document:
//!
//! 1. scan the path table in order and take the first template that matches
//!    (concrete paths were placed ahead of overlapping templates at insert time)
//! 2. pick the operation for the request method
//!
//! A path without a match yields `404 Not Found`; a matched path without an
//! operation for the method yields `405 Method Not Allowed`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//!
//! let router = Router::new(document);
//! let matched = router.route(&Method::GET, "/pet/42")?;
//! assert_eq!(matched.handler_name(), "pet_by_id");
//! assert_eq!(matched.get_path_param("id"), Some("42"));
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
