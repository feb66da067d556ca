//! Security requirements and schemes.

use crate::error::GenerateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One alternative: every named scheme with its required scopes.
pub type SecurityAlternative = IndexMap<String, Vec<String>>;

/// An ordered list of alternatives, any one of which grants access.
///
/// An empty alternative marks anonymous access as allowed: the request is
/// still authenticated if possible, but the lack of credentials is no error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SecurityAlternative>")]
pub struct SecurityRequirement(Vec<SecurityAlternative>);

impl SecurityRequirement {
    pub fn new(alternatives: Vec<SecurityAlternative>) -> Result<Self, GenerateError> {
        if alternatives.is_empty() {
            return Err(GenerateError::InvalidSecurityRequirement(
                "at least one alternative is required".to_string(),
            ));
        }
        Ok(Self(alternatives))
    }

    /// A single scheme without scopes.
    pub fn scheme(name: impl Into<String>) -> Self {
        Self(vec![IndexMap::from([(name.into(), Vec::new())])])
    }

    /// A single scheme demanding `scopes`.
    pub fn scoped<I, S>(name: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(vec![IndexMap::from([(
            name.into(),
            scopes.into_iter().map(Into::into).collect(),
        )])])
    }

    /// Anonymous access only (`[{}]`).
    pub fn anonymous() -> Self {
        Self(vec![IndexMap::new()])
    }

    /// Add another alternative.
    #[must_use]
    pub fn or(mut self, alternative: SecurityAlternative) -> Self {
        self.0.push(alternative);
        self
    }

    /// Add an alternative consisting of one scheme without scopes.
    #[must_use]
    pub fn or_scheme(self, name: impl Into<String>) -> Self {
        self.or(IndexMap::from([(name.into(), Vec::new())]))
    }

    #[must_use]
    pub fn or_anonymous(self) -> Self {
        self.or(IndexMap::new())
    }

    #[must_use]
    pub fn alternatives(&self) -> &[SecurityAlternative] {
        &self.0
    }

    #[must_use]
    pub fn anonymous_access_allowed(&self) -> bool {
        self.0.iter().any(IndexMap::is_empty)
    }
}

impl TryFrom<Vec<SecurityAlternative>> for SecurityRequirement {
    type Error = GenerateError;

    fn try_from(value: Vec<SecurityAlternative>) -> Result<Self, Self::Error> {
        SecurityRequirement::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    /// Scope name to a short description. May be empty.
    pub scopes: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

/// A security scheme declared under `components.securitySchemes`.
///
/// Each variant carries exactly the fields its `type` allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        flows: OAuthFlows,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        #[serde(rename = "openIdConnectUrl")]
        open_id_connect_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "mutualTLS")]
    MutualTls {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecurityScheme {
    pub fn api_key(name: impl Into<String>, location: ApiKeyLocation) -> Self {
        SecurityScheme::ApiKey {
            name: name.into(),
            location,
            description: None,
        }
    }

    pub fn bearer(bearer_format: Option<&str>) -> Self {
        SecurityScheme::Http {
            scheme: "bearer".to_string(),
            bearer_format: bearer_format.map(str::to_string),
            description: None,
        }
    }

    pub fn basic() -> Self {
        SecurityScheme::Http {
            scheme: "basic".to_string(),
            bearer_format: None,
            description: None,
        }
    }

    /// Rejects flows without any flow, and flows missing their mandatory URLs.
    pub fn oauth2(flows: OAuthFlows) -> Result<Self, GenerateError> {
        let invalid = |reason: &str| GenerateError::InvalidSecurityScheme {
            name: "oauth2".to_string(),
            reason: reason.to_string(),
        };
        let mut any = false;
        for (flow, needs_authorization, needs_token) in [
            (&flows.implicit, true, false),
            (&flows.password, false, true),
            (&flows.client_credentials, false, true),
            (&flows.authorization_code, true, true),
        ] {
            let Some(flow) = flow else { continue };
            any = true;
            if needs_authorization && flow.authorization_url.is_none() {
                return Err(invalid("\"authorizationUrl\" is required for this flow"));
            }
            if needs_token && flow.token_url.is_none() {
                return Err(invalid("\"tokenUrl\" is required for this flow"));
            }
        }
        if !any {
            return Err(invalid("at least one flow is required"));
        }
        Ok(SecurityScheme::OAuth2 {
            flows,
            description: None,
        })
    }

    pub fn open_id_connect(url: impl Into<String>) -> Self {
        SecurityScheme::OpenIdConnect {
            open_id_connect_url: url.into(),
            description: None,
        }
    }

    pub fn mutual_tls() -> Self {
        SecurityScheme::MutualTls { description: None }
    }

    #[must_use]
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            SecurityScheme::ApiKey { description, .. }
            | SecurityScheme::Http { description, .. }
            | SecurityScheme::OAuth2 { description, .. }
            | SecurityScheme::OpenIdConnect { description, .. }
            | SecurityScheme::MutualTls { description } => *description = text,
        }
        self
    }
}
