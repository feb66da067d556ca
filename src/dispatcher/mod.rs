//! # Dispatcher Module
//!
//! Turns an incoming [`HttpRequest`](crate::server::HttpRequest) into a call
//! of the matching handler function.
//!
//! For every request the [`RequestHandler`]:
//!
//! 1. routes the method and path against the generated document
//! 2. authenticates when the operation (or the document) declares security
//! 3. parses and coerces the JSON request body
//! 4. coerces path, query, header and cookie parameters, collecting every issue
//! 5. invokes the handler and renders its result
//!
//! Problems caused by the request come back as RFC 9457 problem documents.
//! A handler that fails or panics yields a `500` without details; the cause
//! is logged.

mod arguments;
mod core;

pub use arguments::Arguments;
pub use core::RequestHandler;
