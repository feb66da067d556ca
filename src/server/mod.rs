//! HTTP boundary types.
//!
//! The crate does not run a listener. Requests arrive as
//! `http::Request<Vec<u8>>` and leave as `http::Response<Vec<u8>>`, so any
//! transport that can produce those types can host a
//! [`RequestHandler`](crate::dispatcher::RequestHandler).

pub mod request;
pub mod response;

pub use request::{parse_cookies, parse_query_params, HttpRequest, IncomingRequest};
pub use response::{
    problem_body, problem_type, status_reason, ApiResponse, CreatedResponse, HandlerError,
    HandlerOutput, HeaderVec, NotFoundResponse, OkResponse, ProblemBadRequestResponse,
    ProblemInternalServerErrorResponse, ResponseWrapper, APPLICATION_JSON, PROBLEM_JSON,
};
