use http::header::COOKIE;
use http::Method;
use tracing::debug;

/// The transport-level request accepted by the dispatcher.
pub type HttpRequest = http::Request<Vec<u8>>;

/// Borrowed view over an [`HttpRequest`] with query string and cookies parsed once.
#[derive(Debug)]
pub struct IncomingRequest<'a> {
    inner: &'a HttpRequest,
    query: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl<'a> IncomingRequest<'a> {
    pub fn new(inner: &'a HttpRequest) -> Self {
        let query = parse_query_params(inner.uri().query());
        let cookies = parse_cookies(inner);
        debug!(
            query_count = query.len(),
            cookie_count = cookies.len(),
            body_bytes = inner.body().len(),
            "Parsed request"
        );
        Self {
            inner,
            query,
            cookies,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query parameter, in order.
    pub fn query_all<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.query
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value of a header. Values that are not visible ASCII are treated as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.inner.headers().contains_key(name)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.inner.body()
    }

    #[must_use]
    pub fn inner(&self) -> &HttpRequest {
        self.inner
    }
}

/// Decode a query string into ordered name/value pairs.
#[must_use]
pub fn parse_query_params(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Collect `name=value` pairs from every `Cookie` header.
#[must_use]
pub fn parse_cookies(request: &HttpRequest) -> Vec<(String, String)> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
