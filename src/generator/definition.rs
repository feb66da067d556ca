//! Declarative API definitions.
//!
//! An [`ApiDefinition`] is the explicit, build-once description of a handler
//! type: class-level metadata plus one [`OperationDefinition`] per endpoint.
//! The generator turns it into an [`OpenApiDocument`](crate::spec::OpenApiDocument)
//! and a table of bound handler functions.

use crate::dispatcher::Arguments;
use crate::schema::{Describe, Schema};
use crate::server::{HandlerError, HandlerOutput, ResponseWrapper};
use crate::spec::{ParameterLocation, SecurityRequirement, SecurityScheme};
use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A bound handler function: the API instance plus the coerced arguments in,
/// a [`HandlerOutput`] out.
pub type HandlerFn<A> =
    Arc<dyn Fn(&A, &Arguments) -> Result<HandlerOutput, HandlerError> + Send + Sync>;

/// Implemented by handler types that expose an HTTP API.
///
/// ```rust,ignore
/// impl OpenApi for PetStore {
///     fn definition() -> ApiDefinition<Self> {
///         ApiDefinition::new()
///             .title("Pet Store API")
///             .operation(
///                 OperationDefinition::get("pet_by_id", "/pet/{id}")
///                     .argument(ArgumentDefinition::of::<i64>("id"))
///                     .returns(ReturnType::of::<Pet>())
///                     .handler(|api: &PetStore, args| api.pet_by_id(args.get("id")?)),
///             )
///     }
/// }
/// ```
pub trait OpenApi: Send + Sync + Sized + 'static {
    fn definition() -> ApiDefinition<Self>;
}

/// Class-level metadata and the ordered operations of an API.
pub struct ApiDefinition<A> {
    pub(crate) title: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) openapi_version: Option<String>,
    pub(crate) security_schemes: Option<IndexMap<String, SecurityScheme>>,
    pub(crate) security: Option<SecurityRequirement>,
    pub(crate) operations: Vec<OperationDefinition<A>>,
}

impl<A> Default for ApiDefinition<A> {
    fn default() -> Self {
        Self {
            title: None,
            version: None,
            description: None,
            openapi_version: None,
            security_schemes: None,
            security: None,
            operations: Vec::new(),
        }
    }
}

impl<A> ApiDefinition<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.security_schemes
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), scheme);
        self
    }

    /// Document-level default requirement, applied to operations without their own.
    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security = Some(requirement);
        self
    }

    #[must_use]
    pub fn operation(mut self, operation: OperationDefinition<A>) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDefinition<A>> {
        self.operations.iter()
    }
}

impl<A> fmt::Debug for ApiDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDefinition")
            .field("title", &self.title)
            .field("version", &self.version)
            .field("security", &self.security)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

/// One endpoint: where it lives, what it takes, what it returns and the
/// function that serves it.
pub struct OperationDefinition<A> {
    pub(crate) name: String,
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) deprecated: bool,
    pub(crate) security: Option<SecurityRequirement>,
    pub(crate) arguments: Vec<ArgumentDefinition>,
    pub(crate) returns: Option<ReturnType>,
    pub(crate) handler: Option<HandlerFn<A>>,
}

macro_rules! method_constructors {
    ($($fn_name:ident => $method:ident),+) => {
        $(
            #[must_use]
            pub fn $fn_name(name: impl Into<String>, path: impl Into<String>) -> Self {
                Self::new(name, Method::$method, path)
            }
        )+
    };
}

impl<A> OperationDefinition<A> {
    /// `name` becomes the `operationId` and keys the handler table.
    #[must_use]
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            summary: None,
            description: None,
            tags: Vec::new(),
            deprecated: false,
            security: None,
            arguments: Vec::new(),
            returns: None,
            handler: None,
        }
    }

    method_constructors!(
        get => GET,
        put => PUT,
        post => POST,
        delete => DELETE,
        options => OPTIONS,
        head => HEAD,
        patch => PATCH,
        trace => TRACE
    );

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security = Some(requirement);
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = Some(returns);
        self
    }

    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&A, &Arguments) -> Result<HandlerOutput, HandlerError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<A> fmt::Debug for OperationDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDefinition")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("arguments", &self.arguments)
            .field("returns", &self.returns)
            .field("bound", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// A handler argument and where its value comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub(crate) name: String,
    /// `None` marks the authentication context argument.
    pub(crate) schema: Option<Schema>,
    pub(crate) description: Option<String>,
    pub(crate) location: Option<ParameterLocation>,
    pub(crate) wire_name: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) optional: bool,
    pub(crate) deprecated: bool,
}

impl ArgumentDefinition {
    /// Argument typed by `T`; `Option<T>` makes it optional.
    #[must_use]
    pub fn of<T: Describe>(name: impl Into<String>) -> Self {
        let mut argument = Self::with_schema(name, T::schema());
        argument.optional = T::optional();
        argument
    }

    #[must_use]
    pub fn with_schema(name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema.into()),
            description: None,
            location: None,
            wire_name: None,
            default: None,
            optional: false,
            deprecated: false,
        }
    }

    /// Receives the [`AuthenticationContext`](crate::security::AuthenticationContext)
    /// of an authenticated request. Only valid on operations that require security.
    #[must_use]
    pub fn authentication(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            ..Self::with_schema(name, crate::schema::Literal::String)
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Explicit parameter location, overriding placement by convention.
    #[must_use]
    pub fn location(mut self, location: ParameterLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Wire name differing from the argument name. Not allowed for path parameters.
    #[must_use]
    pub fn named(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Default value advertised in the document. Implies optional.
    ///
    /// Enum defaults are given by their case name.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_authentication(&self) -> bool {
        self.schema.is_none()
    }
}

/// The declared result of a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Void,
    Null,
    Type(Schema),
    /// A [`ResponseWrapper`] with a fixed status and no documented content.
    Response {
        status: u16,
        description: &'static str,
    },
    Union(Vec<ReturnType>),
}

impl ReturnType {
    /// `T`, or `T|null` for `Option<T>`.
    #[must_use]
    pub fn of<T: Describe>() -> Self {
        if T::optional() {
            ReturnType::Union(vec![ReturnType::Type(T::schema()), ReturnType::Null])
        } else {
            ReturnType::Type(T::schema())
        }
    }

    #[must_use]
    pub fn schema(schema: impl Into<Schema>) -> Self {
        ReturnType::Type(schema.into())
    }

    #[must_use]
    pub fn response<W: ResponseWrapper>() -> Self {
        ReturnType::Response {
            status: W::STATUS,
            description: W::DESCRIPTION,
        }
    }

    #[must_use]
    pub fn union<I: IntoIterator<Item = ReturnType>>(branches: I) -> Self {
        ReturnType::Union(branches.into_iter().collect())
    }

    /// Add a branch, turning a single type into a union.
    #[must_use]
    pub fn or(self, other: ReturnType) -> Self {
        match self {
            ReturnType::Union(mut branches) => {
                branches.push(other);
                ReturnType::Union(branches)
            }
            single => ReturnType::Union(vec![single, other]),
        }
    }

    /// Nested unions expanded, in declaration order.
    #[must_use]
    pub fn branches(&self) -> Vec<&ReturnType> {
        match self {
            ReturnType::Union(branches) => branches.iter().flat_map(|b| b.branches()).collect(),
            single => vec![single],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::NotFoundResponse;

    #[test]
    fn test_option_argument_is_optional() {
        let argument = ArgumentDefinition::of::<Option<i64>>("limit");
        assert!(argument.optional);
        assert!(!ArgumentDefinition::of::<i64>("id").optional);
        assert!(ArgumentDefinition::of::<i64>("limit").default(10).optional);
    }

    #[test]
    fn test_authentication_argument_has_no_schema() {
        let argument = ArgumentDefinition::authentication("auth");
        assert!(argument.is_authentication());
        assert_eq!(argument.name(), "auth");
    }

    #[test]
    fn test_return_type_branches_are_flattened() {
        let returns = ReturnType::of::<Option<String>>().or(ReturnType::response::<NotFoundResponse>());
        let branches = returns.branches();
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[1], &ReturnType::Null);
        assert_eq!(
            branches[2],
            &ReturnType::Response {
                status: 404,
                description: "Not Found"
            }
        );
    }
}
