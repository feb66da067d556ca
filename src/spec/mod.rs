//! # Document Model
//!
//! The OpenAPI 3.0 object model produced by the
//! [`generator`](crate::generator) and consumed by the
//! [`dispatcher`](crate::dispatcher).
//!
//! Every optional field is omitted from the serialized form when unset.
//! Router bookkeeping (handler names, argument bindings, domain schemas)
//! rides along on the descriptors in `#[serde(skip)]` fields so it can never
//! leak into the published document.
//!
//! - [`RelativePath`] compiles a path template into a matcher
//! - [`PathTable`] keeps templates in match order and rejects ambiguity
//! - [`SecurityRequirement`] / [`SecurityScheme`] describe authentication

mod path;
mod paths;
mod security;
mod types;

pub use path::RelativePath;
pub use paths::{PathEntry, PathTable};
pub use security::{
    ApiKeyLocation, OAuthFlow, OAuthFlows, SecurityAlternative, SecurityRequirement,
    SecurityScheme,
};
pub use types::*;
