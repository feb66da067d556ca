//! # Generator Module
//!
//! Builds an [`OpenApiDocument`] from an [`ApiDefinition`], once, at startup.
//!
//! ## Parameter placement
//!
//! Every handler argument except the authentication context becomes either a
//! parameter or the request body, decided in this order:
//!
//! 1. an explicit [`ArgumentDefinition::location`] wins (a custom wire name
//!    together with `path` is rejected)
//! 2. an argument named like a `{placeholder}` of the path is a path parameter
//! 3. for `POST`, `PUT` and `PATCH` the first remaining argument is the body
//! 4. anything else is a query parameter
//!
//! ## Responses
//!
//! Void and null branches of the return type are skipped, response wrappers
//! contribute a bare `status: description` entry, and every other branch is
//! merged into `200` with an `application/json` schema. Operations with
//! parameters or a body get a `400 Bad Request` unless they declare one.
//!
//! Every inconsistency is a [`GenerateError`]; nothing here is recoverable at
//! request time.

mod definition;
mod options;
mod registry;

pub use definition::{
    ApiDefinition, ArgumentDefinition, HandlerFn, OpenApi, OperationDefinition, ReturnType,
};
pub use options::GeneratorOptions;
pub use registry::{reference, SchemaRegistry, COMPONENTS_PREFIX};

use crate::error::GenerateError;
use crate::media_type::MediaTypeRange;
use crate::spec::{
    Components, ContentMap, Info, MediaTypeObject, OpenApiDocument, Operation, OperationMeta,
    Parameter, ParameterLocation, ParameterMeta, PathItem, PathTable, RelativePath, RequestBody,
    ResponseObject, Responses, SecurityRequirement, SecurityScheme, DEFAULT_API_VERSION,
    DEFAULT_OPENAPI_VERSION,
};
use http::Method;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Handler functions keyed by operation name.
pub type HandlerTable<A> = HashMap<String, HandlerFn<A>>;

/// The generated document together with the functions bound to its operations.
pub struct GeneratedApi<A> {
    pub document: OpenApiDocument,
    pub handlers: HandlerTable<A>,
}

impl<A> fmt::Debug for GeneratedApi<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&String> = self.handlers.keys().collect();
        bound.sort();
        f.debug_struct("GeneratedApi")
            .field("document", &self.document)
            .field("handlers", &bound)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpenApiGenerator {
    options: GeneratorOptions,
}

impl OpenApiGenerator {
    #[must_use]
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the document for `A`.
    pub fn generate<A: OpenApi>(&self) -> Result<OpenApiDocument, GenerateError> {
        self.build(A::definition()).map(|generated| generated.document)
    }

    /// Generate the document and collect the bound handler functions.
    pub fn build<A>(&self, definition: ApiDefinition<A>) -> Result<GeneratedApi<A>, GenerateError> {
        let ApiDefinition {
            title,
            version,
            description,
            openapi_version,
            security_schemes,
            security,
            operations,
        } = definition;

        if let Some(requirement) = &security {
            check_requirement(requirement, security_schemes.as_ref())?;
        }

        let mut registry = SchemaRegistry::new();
        let mut items: IndexMap<String, (RelativePath, PathItem)> = IndexMap::new();
        let mut handlers: HandlerTable<A> = HashMap::new();
        let operation_count = operations.len();

        for definition in operations {
            let handler_name = definition.name.clone();
            if handlers.contains_key(&handler_name)
                || items
                    .values()
                    .flat_map(|(_, item)| item.operations())
                    .any(|(_, op)| op.meta.handler_name == handler_name)
            {
                return Err(GenerateError::misconfigured(
                    &handler_name,
                    "an operation with this name is already defined",
                ));
            }
            let path = RelativePath::parse(&definition.path)?;
            if let Some(requirement) = &definition.security {
                check_requirement(requirement, security_schemes.as_ref())?;
            }
            let requires_security = definition.security.is_some() || security.is_some();
            let method = definition.method.clone();
            let handler = definition.handler.clone();
            let operation = build_operation(&mut registry, &path, definition, requires_security)?;
            debug!(
                handler = %handler_name,
                method = %method,
                path = %path,
                parameters = operation.parameters.as_ref().map_or(0, Vec::len),
                request_body = operation.request_body.is_some(),
                "Operation generated"
            );

            let (_, item) = items
                .entry(path.as_str().to_string())
                .or_insert_with(|| (path.clone(), PathItem::default()));
            match item.set(&method, operation) {
                Ok(None) => {}
                Ok(Some(previous)) => {
                    return Err(GenerateError::DuplicateOperation {
                        path: path.as_str().to_string(),
                        method,
                        first: previous.meta.handler_name,
                        second: handler_name,
                    });
                }
                Err(_) => {
                    return Err(GenerateError::misconfigured(
                        &handler_name,
                        format!("HTTP method {method} cannot be described"),
                    ));
                }
            }
            if let Some(handler) = handler {
                handlers.insert(handler_name, handler);
            }
        }

        let mut paths = PathTable::new();
        for (_, (path, item)) in items {
            paths.insert(path, item)?;
        }

        let components = if !registry.is_empty() || security_schemes.is_some() {
            Some(Components {
                schemas: (!registry.is_empty()).then(|| registry.into_schemas()),
                security_schemes,
            })
        } else {
            None
        };

        let document = OpenApiDocument {
            openapi: self
                .options
                .openapi_version
                .clone()
                .or(openapi_version)
                .unwrap_or_else(|| DEFAULT_OPENAPI_VERSION.to_string()),
            info: Info {
                title: self.options.api_title.clone().or(title).unwrap_or_default(),
                version: self
                    .options
                    .api_version
                    .clone()
                    .or(version)
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                description,
            },
            servers: self.options.servers.clone().filter(|s| !s.is_empty()),
            paths,
            components,
            security,
        };

        info!(
            operations = operation_count,
            paths = document.paths.len(),
            component_schemas = document
                .components
                .as_ref()
                .and_then(|c| c.schemas.as_ref())
                .map_or(0, IndexMap::len),
            bound_handlers = handlers.len(),
            "OpenAPI document generated"
        );

        Ok(GeneratedApi { document, handlers })
    }
}

fn check_requirement(
    requirement: &SecurityRequirement,
    schemes: Option<&IndexMap<String, SecurityScheme>>,
) -> Result<(), GenerateError> {
    for name in requirement.alternatives().iter().flat_map(|alt| alt.keys()) {
        if !schemes.is_some_and(|s| s.contains_key(name)) {
            return Err(GenerateError::InvalidSecurityRequirement(format!(
                "security scheme \"{name}\" is not declared"
            )));
        }
    }
    Ok(())
}

fn build_operation<A>(
    registry: &mut SchemaRegistry,
    path: &RelativePath,
    definition: OperationDefinition<A>,
    requires_security: bool,
) -> Result<Operation, GenerateError> {
    let OperationDefinition {
        name,
        method,
        summary,
        description,
        tags,
        deprecated,
        security,
        arguments,
        returns,
        ..
    } = definition;

    let accepts_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
    let mut parameters: Vec<Parameter> = Vec::new();
    let mut request_body: Option<RequestBody> = None;
    let mut authentication_argument: Option<String> = None;

    for argument in arguments {
        let Some(schema) = argument.schema.clone() else {
            if !requires_security {
                return Err(GenerateError::misconfigured(
                    &name,
                    format!(
                        "the argument \"{}\" receives the authentication context, but this operation does not require authentication",
                        argument.name
                    ),
                ));
            }
            authentication_argument = Some(argument.name);
            continue;
        };
        let wire_schema = registry.to_wire(&schema);

        let location = match argument.location {
            Some(ParameterLocation::Path) if argument.wire_name.is_some() => {
                return Err(GenerateError::misconfigured(
                    &name,
                    format!(
                        "the argument \"{}\" has a custom name, but path parameter names are derived from the path template",
                        argument.name
                    ),
                ));
            }
            Some(ParameterLocation::Path) if !path.contains_placeholder(&argument.name) => {
                return Err(GenerateError::misconfigured(
                    &name,
                    format!(
                        "the argument \"{}\" is a path parameter, but \"{path}\" has no such placeholder",
                        argument.name
                    ),
                ));
            }
            Some(location) => location,
            None if path.contains_placeholder(&argument.name) => ParameterLocation::Path,
            None if accepts_body => {
                if let Some(existing) = &request_body {
                    return Err(GenerateError::misconfigured(
                        &name,
                        format!(
                            "the arguments \"{}\" and \"{}\" both qualify as request body",
                            existing.argument, argument.name
                        ),
                    ));
                }
                request_body = Some(RequestBody {
                    description: argument.description,
                    content: ContentMap::default().with(
                        MediaTypeRange::json(),
                        MediaTypeObject {
                            schema: Some(wire_schema),
                            domain_schema: Some(schema),
                        },
                    ),
                    required: Some(!argument.optional),
                    argument: argument.name,
                });
                continue;
            }
            None => ParameterLocation::Query,
        };

        let wire_name = argument.wire_name.unwrap_or_else(|| argument.name.clone());
        let mut parameter = Parameter::new(
            wire_name,
            location,
            !argument.optional,
            Some(wire_schema),
            argument.default,
        )?
        .with_description(argument.description)
        .with_meta(ParameterMeta {
            schema: Some(schema),
            argument: argument.name,
        });
        if argument.deprecated {
            parameter.deprecated = Some(true);
        }
        parameters.push(parameter);
    }

    let Some(returns) = returns else {
        return Err(GenerateError::misconfigured(&name, "the return type is missing"));
    };
    let mut responses = responses_for(registry, &returns);
    if (request_body.is_some() || !parameters.is_empty()) && !responses.has_status(400) {
        responses = responses.with(400, ResponseObject::new("Bad Request"));
    }

    Ok(Operation {
        summary,
        description,
        operation_id: Some(name.clone()),
        tags: (!tags.is_empty()).then_some(tags),
        parameters: (!parameters.is_empty()).then_some(parameters),
        request_body,
        responses,
        deprecated: deprecated.then_some(true),
        security,
        meta: OperationMeta {
            handler_name: name,
            authentication_argument,
        },
    })
}

fn responses_for(registry: &mut SchemaRegistry, returns: &ReturnType) -> Responses {
    let mut responses = Responses::default();
    let mut content_schemas: Vec<Value> = Vec::new();
    for branch in returns.branches() {
        match branch {
            ReturnType::Void | ReturnType::Null | ReturnType::Union(_) => {}
            ReturnType::Response {
                status,
                description,
            } => {
                responses = responses.with(*status, ResponseObject::new(*description));
            }
            ReturnType::Type(schema) => content_schemas.push(registry.to_wire(schema)),
        }
    }
    let schema = match content_schemas.len() {
        0 => return responses,
        1 => content_schemas.remove(0),
        _ => json!({ "anyOf": content_schemas }),
    };
    responses.with(
        200,
        ResponseObject::new("Default").with_content(ContentMap::default().with(
            MediaTypeRange::json(),
            MediaTypeObject {
                schema: Some(schema),
                domain_schema: None,
            },
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Describe, EnumSchema, ShapeSchema};
    use crate::server::{HandlerOutput, NotFoundResponse};

    struct Api;

    fn pet() -> crate::schema::Schema {
        ShapeSchema::new("Pet")
            .property("id", i64::schema())
            .property("name", String::schema())
            .into()
    }

    fn generate(definition: ApiDefinition<Api>) -> Result<OpenApiDocument, GenerateError> {
        OpenApiGenerator::default()
            .build(definition)
            .map(|g| g.document)
    }

    #[test]
    fn test_path_placeholder_becomes_path_parameter() {
        let doc = generate(ApiDefinition::new().operation(
            OperationDefinition::get("pet_by_id", "/pet/{id}")
                .argument(ArgumentDefinition::of::<i64>("id"))
                .returns(ReturnType::schema(pet()).or(ReturnType::response::<NotFoundResponse>())),
        ))
        .unwrap();
        let value = doc.to_value().unwrap();
        let op = &value["paths"]["/pet/{id}"]["get"];
        assert_eq!(
            op["parameters"],
            json!([{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}])
        );
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/Pet"})
        );
        assert_eq!(op["responses"]["400"], json!({"description": "Bad Request"}));
        assert_eq!(op["responses"]["404"], json!({"description": "Not Found"}));
        assert_eq!(op["operationId"], "pet_by_id");
    }

    #[test]
    fn test_post_argument_becomes_request_body() {
        let doc = generate(ApiDefinition::new().operation(
            OperationDefinition::post("add_pet", "/pets")
                .argument(ArgumentDefinition::with_schema("pet", ShapeSchema::new("Pet")))
                .returns(ReturnType::Void),
        ))
        .unwrap();
        let value = doc.to_value().unwrap();
        let op = &value["paths"]["/pets"]["post"];
        assert!(op.get("parameters").is_none());
        assert_eq!(op["requestBody"]["required"], true);
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/Pet"})
        );
    }

    #[test]
    fn test_second_body_candidate_is_rejected() {
        let err = generate(ApiDefinition::new().operation(
            OperationDefinition::put("replace", "/pets")
                .argument(ArgumentDefinition::of::<String>("a"))
                .argument(ArgumentDefinition::of::<String>("b"))
                .returns(ReturnType::Void),
        ))
        .unwrap_err();
        assert!(matches!(err, GenerateError::Misconfiguration { .. }));
    }

    #[test]
    fn test_custom_name_on_path_parameter_is_rejected() {
        let err = generate(ApiDefinition::new().operation(
            OperationDefinition::get("pet", "/pet/{id}")
                .argument(
                    ArgumentDefinition::of::<i64>("id")
                        .location(ParameterLocation::Path)
                        .named("petId"),
                )
                .returns(ReturnType::Void),
        ))
        .unwrap_err();
        assert!(matches!(err, GenerateError::Misconfiguration { .. }));
    }

    #[test]
    fn test_optional_path_parameter_is_rejected() {
        let err = generate(ApiDefinition::new().operation(
            OperationDefinition::get("pet", "/pet/{id}")
                .argument(ArgumentDefinition::of::<Option<i64>>("id"))
                .returns(ReturnType::Void),
        ))
        .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter { .. }));
    }

    #[test]
    fn test_authentication_argument_requires_security() {
        let err = generate(ApiDefinition::new().operation(
            OperationDefinition::get("me", "/me")
                .argument(ArgumentDefinition::authentication("auth"))
                .returns(ReturnType::Void),
        ))
        .unwrap_err();
        assert!(matches!(err, GenerateError::Misconfiguration { .. }));
    }

    #[test]
    fn test_missing_return_type_is_rejected() {
        let err = generate(
            ApiDefinition::new().operation(OperationDefinition::get("nothing", "/nothing")),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GenerateError::misconfigured("nothing", "the return type is missing")
        );
    }

    #[test]
    fn test_undeclared_security_scheme_is_rejected() {
        let err = generate(
            ApiDefinition::new().security(SecurityRequirement::scheme("apiKey")),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidSecurityRequirement(_)));
    }

    #[test]
    fn test_enum_default_and_union_merge() {
        let status = EnumSchema::new("PetStatus", ["available", "sold"]);
        let doc = generate(ApiDefinition::new().operation(
            OperationDefinition::get("find", "/pets")
                .argument(
                    ArgumentDefinition::with_schema("status", status).default("available"),
                )
                .returns(ReturnType::of::<String>().or(ReturnType::of::<i64>())),
        ))
        .unwrap();
        let value = doc.to_value().unwrap();
        let op = &value["paths"]["/pets"]["get"];
        assert_eq!(op["parameters"][0]["required"], false);
        assert_eq!(
            op["parameters"][0]["schema"],
            json!({"$ref": "#/components/schemas/PetStatus"})
        );
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"],
            json!({"anyOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn test_handlers_are_collected() {
        let generated = OpenApiGenerator::default()
            .build(ApiDefinition::<Api>::new().operation(
                OperationDefinition::get("ping", "/ping")
                    .returns(ReturnType::Void)
                    .handler(|_, _| Ok(HandlerOutput::Empty)),
            ))
            .unwrap();
        assert!(generated.handlers.contains_key("ping"));
        assert!(generated.document.components.is_none());
    }
}
