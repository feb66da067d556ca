//! Response building: plain responses, RFC 9110 problem documents and the
//! response wrappers handlers return to pick their own status code.

use crate::error::RequestError;
use crate::schema::CoerceError;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;

pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage (≤16 headers stay inline).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

pub const PROBLEM_JSON: &str = "application/problem+json";
pub const APPLICATION_JSON: &str = "application/json";

/// Errors raised by handler functions. Any error type converts into it.
pub type HandlerError = anyhow::Error;

#[must_use]
pub fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// `https://www.rfc-editor.org/rfc/rfc9110#name-404-not-found` and friends.
#[must_use]
pub fn problem_type(status: StatusCode) -> String {
    format!(
        "https://www.rfc-editor.org/rfc/rfc9110#name-{}-{}",
        status.as_u16(),
        status_reason(status).to_lowercase().replace(' ', "-")
    )
}

/// `{type, title, detail?, ...extra}`; `detail` only when non-empty.
#[must_use]
pub fn problem_body(status: StatusCode, detail: &str, extra: Map<String, Value>) -> Value {
    let mut body = Map::new();
    body.insert("type".to_string(), Value::String(problem_type(status)));
    body.insert(
        "title".to_string(),
        Value::String(status_reason(status).to_string()),
    );
    if !detail.is_empty() {
        body.insert("detail".to_string(), Value::String(detail.to_string()));
    }
    body.extend(extra);
    Value::Object(body)
}

/// A fully rendered response, independent of the HTTP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            content_type: Some(APPLICATION_JSON.to_string()),
            body: body.to_string().into_bytes(),
            ..Self::new(status)
        }
    }

    /// A body without a forced content type.
    #[must_use]
    pub fn raw(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::new(status)
        }
    }

    #[must_use]
    pub fn problem(status: StatusCode, detail: &str, extra: Map<String, Value>) -> Self {
        Self {
            content_type: Some(PROBLEM_JSON.to_string()),
            body: problem_body(status, detail, extra).to_string().into_bytes(),
            ..Self::new(status)
        }
    }

    /// Add or replace a header (case-insensitive).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Append a header, keeping any earlier values of the same name.
    #[must_use]
    pub fn add_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Every value of `name`, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        if let Some(content_type) = &self.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        builder.body(self.body)
    }
}

impl From<&RequestError> for ApiResponse {
    fn from(err: &RequestError) -> Self {
        let mut extra = Map::new();
        if !err.issues().is_empty() {
            extra.insert(
                "issues".to_string(),
                serde_json::to_value(err.issues()).unwrap_or(Value::Null),
            );
        }
        ApiResponse::problem(err.status(), err.detail(), extra)
    }
}

/// A handler result type that fixes its own status code.
///
/// Declaring a wrapper as a return type adds a bare `STATUS: DESCRIPTION`
/// entry to the operation's responses.
pub trait ResponseWrapper {
    const STATUS: u16;
    const DESCRIPTION: &'static str;

    fn into_response(self) -> ApiResponse;
}

/// Extra response headers, shared by the bundled wrappers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedHeaders(HeaderVec);

impl AddedHeaders {
    fn push(&mut self, name: &str, value: String) {
        self.0.push((Arc::from(name), value));
    }

    fn apply(self, mut response: ApiResponse) -> ApiResponse {
        for (name, value) in self.0 {
            response = response.add_header(&name, value);
        }
        response
    }
}

macro_rules! text_wrapper {
    ($(#[$doc:meta])* $name:ident, $status:expr, $description:expr, problem_when_empty = $problem:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            body: Option<String>,
            headers: AddedHeaders,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            #[must_use]
            pub fn with_body(body: impl Into<String>) -> Self {
                Self {
                    body: Some(body.into()),
                    ..Self::default()
                }
            }

            #[must_use]
            pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
                self.headers.push(name, value.into());
                self
            }
        }

        impl ResponseWrapper for $name {
            const STATUS: u16 = $status;
            const DESCRIPTION: &'static str = $description;

            fn into_response(self) -> ApiResponse {
                let status = StatusCode::from_u16(Self::STATUS).unwrap_or(StatusCode::OK);
                let response = match self.body {
                    Some(body) => ApiResponse::raw(status, body),
                    None if $problem => ApiResponse::problem(status, "", Map::new()),
                    None => ApiResponse::new(status),
                };
                self.headers.apply(response)
            }
        }
    };
}

text_wrapper!(
    /// `200 OK` with an optional plain body.
    OkResponse, 200, "OK", problem_when_empty = false
);
text_wrapper!(
    /// `201 Created` with an optional plain body, typically paired with a `Location` header.
    CreatedResponse, 201, "Created", problem_when_empty = false
);
text_wrapper!(
    /// `404 Not Found`. Without a body it renders as a problem document.
    NotFoundResponse, 404, "Not Found", problem_when_empty = true
);

/// `400 Bad Request` problem document carrying coercion issues.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemBadRequestResponse {
    error: CoerceError,
    headers: AddedHeaders,
}

impl ProblemBadRequestResponse {
    #[must_use]
    pub fn new(error: CoerceError) -> Self {
        Self {
            error,
            headers: AddedHeaders::default(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push(name, value.into());
        self
    }
}

impl ResponseWrapper for ProblemBadRequestResponse {
    const STATUS: u16 = 400;
    const DESCRIPTION: &'static str = "Bad Request";

    fn into_response(self) -> ApiResponse {
        let mut extra = Map::new();
        extra.insert(
            "issues".to_string(),
            serde_json::to_value(&self.error.issues).unwrap_or(Value::Null),
        );
        self.headers
            .apply(ApiResponse::problem(StatusCode::BAD_REQUEST, "", extra))
    }
}

/// `500 Internal Server Error` problem document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemInternalServerErrorResponse {
    detail: String,
    headers: AddedHeaders,
}

impl ProblemInternalServerErrorResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposed to the client verbatim; keep internals out of it.
    #[must_use]
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push(name, value.into());
        self
    }
}

impl ResponseWrapper for ProblemInternalServerErrorResponse {
    const STATUS: u16 = 500;
    const DESCRIPTION: &'static str = "Internal Server Error";

    fn into_response(self) -> ApiResponse {
        self.headers.apply(ApiResponse::problem(
            StatusCode::INTERNAL_SERVER_ERROR,
            &self.detail,
            Map::new(),
        ))
    }
}

/// What a handler function hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// A response wrapper result, sent as-is.
    Response(ApiResponse),
    /// Serialized as JSON with status 200. Must be an object or an array.
    Json(Value),
    /// Sent verbatim with status 200 and no forced content type.
    Text(String),
    /// Empty body, status 200.
    Empty,
}

impl HandlerOutput {
    pub fn wrap<W: ResponseWrapper>(wrapper: W) -> Self {
        HandlerOutput::Response(wrapper.into_response())
    }

    /// Serialize any value as the JSON result.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(HandlerOutput::Json(serde_json::to_value(value)?))
    }
}

impl From<ApiResponse> for HandlerOutput {
    fn from(response: ApiResponse) -> Self {
        HandlerOutput::Response(response)
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        HandlerOutput::Text(text)
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        HandlerOutput::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Issue;
    use serde_json::json;

    fn body(response: &ApiResponse) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_problem_type_slug() {
        assert_eq!(
            problem_type(StatusCode::METHOD_NOT_ALLOWED),
            "https://www.rfc-editor.org/rfc/rfc9110#name-405-method-not-allowed"
        );
    }

    #[test]
    fn test_problem_body_omits_empty_detail() {
        let value = problem_body(StatusCode::NOT_FOUND, "", Map::new());
        assert_eq!(
            value,
            json!({
                "type": "https://www.rfc-editor.org/rfc/rfc9110#name-404-not-found",
                "title": "Not Found"
            })
        );
        let value = problem_body(StatusCode::UNAUTHORIZED, "Missing credentials", Map::new());
        assert_eq!(value["detail"], "Missing credentials");
    }

    #[test]
    fn test_request_error_carries_issues() {
        let err = RequestError::invalid(vec![Issue::required().prefixed(["query", "limit"])]);
        let response = ApiResponse::from(&err);
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.content_type.as_deref(), Some(PROBLEM_JSON));
        let value = body(&response);
        assert_eq!(value["title"], "Bad Request");
        assert!(value.get("detail").is_none());
        assert_eq!(value["issues"][0]["path"], json!(["query", "limit"]));
    }

    #[test]
    fn test_not_found_wrapper_renders_problem() {
        let response = NotFoundResponse::new().into_response();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type.as_deref(), Some(PROBLEM_JSON));
        assert_eq!(body(&response)["title"], "Not Found");

        let response = NotFoundResponse::with_body("gone").into_response();
        assert_eq!(response.content_type, None);
        assert_eq!(response.body, b"gone");
    }

    #[test]
    fn test_wrapper_headers() {
        let response = CreatedResponse::new()
            .with_header("Location", "/pet/4")
            .into_response();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.get_header("location"), Some("/pet/4"));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_wrapper_headers_are_appended() {
        let response = OkResponse::new()
            .with_header("Set-Cookie", "a=1")
            .with_header("Set-Cookie", "b=2")
            .into_response();
        let cookies: Vec<&str> = response.header_values("set-cookie").collect();
        assert_eq!(cookies, ["a=1", "b=2"]);

        let response = response.into_http().unwrap();
        let cookies: Vec<&str> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }

    #[test]
    fn test_with_header_replaces() {
        let response = ApiResponse::new(StatusCode::OK)
            .add_header("x-request-id", "old")
            .with_header("X-Request-Id", "new");
        assert_eq!(response.header_values("x-request-id").collect::<Vec<_>>(), ["new"]);
    }

    #[test]
    fn test_into_http() {
        let response = ApiResponse::json(StatusCode::OK, &json!({"id": 1}))
            .with_header("X-Request-Id", "abc")
            .into_http()
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(response.body(), br#"{"id":1}"#);
    }
}
