use super::{AuthenticationContext, AuthenticationContextProvider};
use crate::error::RequestError;
use crate::server::IncomingRequest;
use crate::spec::{ApiKeyLocation, OpenApiDocument, SecurityRequirement, SecurityScheme};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

/// A secret accepted for one security scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    /// API key, bearer token, or `user:password` for basic auth.
    secret: String,
    subject: String,
    scopes: Vec<String>,
    claims: Value,
}

impl Credential {
    pub fn new(secret: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            subject: subject.into(),
            scopes: Vec::new(),
            claims: Value::Null,
        }
    }

    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn claims(mut self, claims: Value) -> Self {
        self.claims = claims;
        self
    }

    fn grants(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// Validates requests against a fixed set of credentials per scheme.
///
/// Understands `apiKey` (header, query, cookie), `http` `bearer` and `basic`,
/// and treats `oauth2` / `openIdConnect` tokens as bearer tokens. Alternatives
/// are tried in order and the first satisfied one wins; every scheme of an
/// alternative must be satisfied with all its scopes granted.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialsProvider {
    schemes: IndexMap<String, SecurityScheme>,
    credentials: IndexMap<String, Vec<Credential>>,
}

impl StaticCredentialsProvider {
    #[must_use]
    pub fn new(schemes: IndexMap<String, SecurityScheme>) -> Self {
        Self {
            schemes,
            credentials: IndexMap::new(),
        }
    }

    /// Uses the security schemes declared by `document`.
    #[must_use]
    pub fn for_document(document: &OpenApiDocument) -> Self {
        Self::new(
            document
                .components
                .as_ref()
                .and_then(|c| c.security_schemes.clone())
                .unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn credential(mut self, scheme: impl Into<String>, credential: Credential) -> Self {
        self.credentials
            .entry(scheme.into())
            .or_default()
            .push(credential);
        self
    }

    /// Basic credentials are matched on `user:password`.
    #[must_use]
    pub fn basic(
        self,
        scheme: impl Into<String>,
        user: &str,
        password: &str,
        scopes: &[&str],
    ) -> Self {
        self.credential(
            scheme,
            Credential::new(format!("{user}:{password}"), user).scopes(scopes.iter().copied()),
        )
    }

    fn presented(&self, scheme: &SecurityScheme, request: &IncomingRequest<'_>) -> Option<String> {
        match scheme {
            SecurityScheme::ApiKey { name, location, .. } => match location {
                ApiKeyLocation::Header => request.header(name),
                ApiKeyLocation::Query => request.query(name),
                ApiKeyLocation::Cookie => request.cookie(name),
            }
            .map(str::to_string),
            SecurityScheme::Http { scheme, .. } if scheme.eq_ignore_ascii_case("basic") => {
                let encoded = authorization(request, "Basic")?;
                let decoded = STANDARD.decode(encoded.trim()).ok()?;
                String::from_utf8(decoded).ok()
            }
            SecurityScheme::Http { scheme, .. } if scheme.eq_ignore_ascii_case("bearer") => {
                authorization(request, "Bearer").map(str::to_string)
            }
            SecurityScheme::OAuth2 { .. } | SecurityScheme::OpenIdConnect { .. } => {
                authorization(request, "Bearer").map(str::to_string)
            }
            SecurityScheme::Http { .. } | SecurityScheme::MutualTls { .. } => None,
        }
    }

    fn satisfy(
        &self,
        name: &str,
        scopes: &[String],
        request: &IncomingRequest<'_>,
    ) -> Option<&Credential> {
        let Some(scheme) = self.schemes.get(name) else {
            warn!(scheme = %name, "Security scheme is not known to the provider");
            return None;
        };
        let secret = self.presented(scheme, request)?;
        self.credentials
            .get(name)?
            .iter()
            .find(|c| c.secret == secret && c.grants(scopes))
    }
}

/// Credentials of an `Authorization: <prefix> <value>` header, prefix case-insensitive.
fn authorization<'r>(request: &'r IncomingRequest<'_>, prefix: &str) -> Option<&'r str> {
    let header = request.header("authorization")?;
    let (kind, value) = header.split_once(' ')?;
    kind.eq_ignore_ascii_case(prefix).then_some(value.trim())
}

impl AuthenticationContextProvider for StaticCredentialsProvider {
    fn authenticate(
        &self,
        request: &IncomingRequest<'_>,
        requirement: &SecurityRequirement,
    ) -> Result<Option<AuthenticationContext>, RequestError> {
        for alternative in requirement.alternatives() {
            if alternative.is_empty() {
                continue;
            }
            let satisfied: Option<Vec<(&String, &Credential)>> = alternative
                .iter()
                .map(|(name, scopes)| self.satisfy(name, scopes, request).map(|c| (name, c)))
                .collect();
            let Some(satisfied) = satisfied else {
                continue;
            };
            let Some((scheme, credential)) = satisfied.first() else {
                continue;
            };
            debug!(scheme = %scheme, subject = %credential.subject, "Request authenticated");
            return Ok(Some(
                AuthenticationContext::new(scheme.as_str(), credential.subject.as_str())
                    .with_scopes(credential.scopes.iter().cloned())
                    .with_claims(credential.claims.clone()),
            ));
        }
        Ok(None)
    }
}
