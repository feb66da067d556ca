//! Media type ranges as used in `Content-Type` headers and request body
//! content maps.
//!
//! A range has the shape `type/subtype` where either half may be `*`.
//! Parameters such as `; charset=utf-8` are accepted but ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static MEDIA_TYPE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<type>[.!#%&'`^~$*+|\w-]+)/(?P<subtype>[.!#%&'`^~$*+|\w-]+)\s*(?:;.*)?$",
    )
    .expect("media type regex should be valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaTypeError {
    #[error("invalid media type range \"{0}\"")]
    InvalidFormat(String),
}

/// A parsed `type/subtype` pair, wildcards allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaTypeRange {
    /// The verbatim input, used as the key in serialized content maps.
    pub value: String,
    pub type_: String,
    pub subtype: String,
}

impl MediaTypeRange {
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let caps = MEDIA_TYPE_RANGE
            .captures(value)
            .ok_or_else(|| MediaTypeError::InvalidFormat(value.to_string()))?;
        Ok(Self {
            value: value.to_string(),
            type_: caps["type"].to_ascii_lowercase(),
            subtype: caps["subtype"].to_ascii_lowercase(),
        })
    }

    /// `application/json`, the only body encoding the dispatcher understands.
    #[must_use]
    pub fn json() -> Self {
        Self {
            value: "application/json".to_string(),
            type_: "application".to_string(),
            subtype: "json".to_string(),
        }
    }

    /// Each half matches when equal or when either side is `*`.
    #[must_use]
    pub fn matches(&self, other: &MediaTypeRange) -> bool {
        let type_ok = self.type_ == other.type_ || self.type_ == "*" || other.type_ == "*";
        let subtype_ok =
            self.subtype == other.subtype || self.subtype == "*" || other.subtype == "*";
        type_ok && subtype_ok
    }

    #[must_use]
    pub fn has_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// Pick the declared range that best serves `requested`.
    ///
    /// The first concrete-subtype match wins; a `type/*` match is only kept as
    /// a fallback for when no concrete match exists.
    pub fn best_match<'a, T, I>(declared: I, requested: &MediaTypeRange) -> Option<&'a T>
    where
        I: IntoIterator<Item = (&'a MediaTypeRange, &'a T)>,
        T: 'a,
    {
        let mut candidate = None;
        for (range, item) in declared {
            if !range.matches(requested) {
                continue;
            }
            if !range.has_wildcard_subtype() {
                return Some(item);
            }
            candidate = Some(item);
        }
        candidate
    }
}

impl FromStr for MediaTypeRange {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaTypeRange::parse(s)
    }
}

impl fmt::Display for MediaTypeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> MediaTypeRange {
        MediaTypeRange::parse(s).unwrap()
    }

    #[test]
    fn test_parse_splits_type_and_subtype() {
        let r = range("Application/JSON; charset=utf-8");
        assert_eq!(r.type_, "application");
        assert_eq!(r.subtype, "json");
        assert_eq!(r.value, "Application/JSON; charset=utf-8");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for bad in ["", "json", "application/", "/json", "application/json/x", "a b/c"] {
            assert!(
                matches!(MediaTypeRange::parse(bad), Err(MediaTypeError::InvalidFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_is_reflexive() {
        for s in ["application/json", "text/plain", "application/problem+json"] {
            assert!(range(s).matches(&range(s)));
        }
    }

    #[test]
    fn test_wildcards() {
        assert!(range("application/*").matches(&range("application/json")));
        assert!(range("*/*").matches(&range("text/plain")));
        assert!(range("application/json").matches(&range("*/*")));
        assert!(!range("application/*").matches(&range("text/plain")));
        assert!(!range("application/xml").matches(&range("application/json")));
    }

    #[test]
    fn test_best_match_prefers_concrete_subtype() {
        let declared = vec![
            (range("application/*"), "wild"),
            (range("application/json"), "json"),
        ];
        let picked = MediaTypeRange::best_match(
            declared.iter().map(|(r, v)| (r, v)),
            &range("application/json"),
        );
        assert_eq!(picked, Some(&"json"));

        let picked = MediaTypeRange::best_match(
            declared.iter().map(|(r, v)| (r, v)),
            &range("application/xml"),
        );
        assert_eq!(picked, Some(&"wild"));

        let picked =
            MediaTypeRange::best_match(declared.iter().map(|(r, v)| (r, v)), &range("text/plain"));
        assert_eq!(picked, None);
    }
}
