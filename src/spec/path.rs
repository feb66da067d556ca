//! Templated relative paths (`/pets/{id}`).
//!
//! # Compile vs match
//!
//! A [`RelativePath`] is compiled once when the document is generated: every
//! `{name}` placeholder becomes a capture group matching one or more non-`/`
//! characters and the literal chunks are escaped. The anchored pattern is
//! case-insensitive. At request time only [`RelativePath::matches`] runs.

use crate::error::GenerateError;
use crate::router::ParamVec;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^/{}]+)\}").expect("placeholder regex should be valid"));

/// Marker replacing every placeholder in the structural skeleton.
const WILDCARD: &str = "{}";

#[derive(Clone)]
pub struct RelativePath {
    value: String,
    placeholders: Vec<Arc<str>>,
    matcher: Regex,
    /// Lowercased, as matching ignores case.
    skeleton: String,
}

impl RelativePath {
    pub fn parse(value: &str) -> Result<Self, GenerateError> {
        let invalid = |reason: &str| GenerateError::InvalidPathTemplate {
            path: value.to_string(),
            reason: reason.to_string(),
        };
        if !value.starts_with('/') {
            return Err(invalid("must start with \"/\""));
        }
        let mut pattern = String::with_capacity(value.len() + 16);
        pattern.push_str("(?i)^");
        let mut skeleton = String::with_capacity(value.len());
        let mut placeholders = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(value) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let literal = &value[last..whole.start()];
            if literal.contains(['{', '}']) {
                return Err(invalid("unbalanced or malformed placeholder"));
            }
            pattern.push_str(&regex::escape(literal));
            pattern.push_str("([^/]+)");
            skeleton.push_str(literal);
            skeleton.push_str(WILDCARD);
            placeholders.push(Arc::<str>::from(name.as_str()));
            last = whole.end();
        }
        let tail = &value[last..];
        pattern.push_str(&regex::escape(tail));
        pattern.push('$');
        skeleton.push_str(tail);

        if tail.contains(['{', '}']) {
            return Err(invalid("unbalanced or malformed placeholder"));
        }
        let matcher = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            value: value.to_string(),
            placeholders,
            matcher,
            skeleton: skeleton.to_lowercase(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Placeholder names in template order.
    #[must_use]
    pub fn placeholders(&self) -> &[Arc<str>] {
        &self.placeholders
    }

    /// True if the template contains exactly `{name}`.
    #[must_use]
    pub fn contains_placeholder(&self, name: &str) -> bool {
        self.placeholders.iter().any(|p| p.as_ref() == name)
    }

    #[must_use]
    pub fn is_templated(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Match a concrete request path, returning the percent-decoded variables.
    ///
    /// `None` means "no match", not an error.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> Option<ParamVec> {
        let caps = self.matcher.captures(candidate)?;
        let mut params = ParamVec::new();
        for (i, name) in self.placeholders.iter().enumerate() {
            let raw = caps.get(i + 1)?.as_str();
            let decoded = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            params.push((Arc::clone(name), decoded));
        }
        Some(params)
    }

    /// Same static segments in the same places, placeholder names and letter
    /// case ignored.
    #[must_use]
    pub fn equals_structurally(&self, other: &RelativePath) -> bool {
        self.skeleton == other.skeleton
    }
}

impl PartialEq for RelativePath {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for RelativePath {}

impl fmt::Debug for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelativePath").field(&self.value).finish()
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for RelativePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[test]
    fn test_placeholders() {
        let p = path("/users/{userId}/posts/{postId}");
        assert!(p.is_templated());
        assert!(p.contains_placeholder("userId"));
        assert!(!p.contains_placeholder("user"));
        assert!(!path("/pets").is_templated());
    }

    #[test]
    fn test_matches_extracts_variables() {
        let params = path("/users/{userId}/posts/{postId}")
            .matches("/users/42/posts/hello%20world")
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].0.as_ref(), "userId");
        assert_eq!(params[0].1, "42");
        assert_eq!(params[1].1, "hello world");
    }

    #[test]
    fn test_matches_is_anchored_and_case_insensitive() {
        let p = path("/Pets/{id}");
        assert!(p.matches("/pets/1").is_some());
        assert!(p.matches("/pets/1/extra").is_none());
        assert!(p.matches("/pets/").is_none());
        assert!(p.matches("/api/pets/1").is_none());
    }

    #[test]
    fn test_literal_chunks_are_escaped() {
        let p = path("/files/{name}.json");
        assert!(p.matches("/files/a.json").is_some());
        assert!(p.matches("/files/aXjson").is_none());
    }

    #[test]
    fn test_equals_structurally() {
        assert!(path("/pets/{pet}").equals_structurally(&path("/pets/{petId}")));
        assert!(!path("/pets/{pet}").equals_structurally(&path("/pets/mine")));
        assert!(!path("/{entity}/me").equals_structurally(&path("/books/{id}")));
        assert!(path("/Pets/{pet}").equals_structurally(&path("/pets/{id}")));
        assert!(path("/pets").equals_structurally(&path("/PETS")));
    }

    #[test]
    fn test_rejects_malformed_templates() {
        assert!(RelativePath::parse("pets").is_err());
        assert!(RelativePath::parse("/pets/{id").is_err());
        assert!(RelativePath::parse("/pets/{}").is_err());
    }
}
