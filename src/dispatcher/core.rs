use super::arguments::Arguments;
use crate::error::{DispatchError, GenerateError, RequestError};
use crate::generator::{ApiDefinition, GeneratedApi, HandlerTable, OpenApi, OpenApiGenerator};
use crate::ids::RequestId;
use crate::media_type::MediaTypeRange;
use crate::router::{RouteMatch, Router};
use crate::runtime_config::{RuntimeConfig, DEFAULT_MAX_BODY_BYTES};
use crate::schema::{Issue, Schema};
use crate::security::AuthenticationContextProvider;
use crate::server::{
    ApiResponse, HandlerOutput, HttpRequest, IncomingRequest, ProblemInternalServerErrorResponse,
    ResponseWrapper,
};
use crate::spec::{OpenApiDocument, Parameter, ParameterLocation, RequestBody};
use http::StatusCode;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Why a request did not reach a regular handler result.
enum Failure {
    /// Rendered as a problem response.
    Request(RequestError),
    /// Escapes `handle` as `Err`.
    Fatal(DispatchError),
}

impl From<RequestError> for Failure {
    fn from(err: RequestError) -> Self {
        Failure::Request(err)
    }
}

impl From<DispatchError> for Failure {
    fn from(err: DispatchError) -> Self {
        Failure::Fatal(err)
    }
}

/// Routes requests to the handler functions of an [`OpenApi`] type.
///
/// Holds the generated document behind an `Arc` and never mutates it, so one
/// instance can serve concurrent `handle` calls from any number of threads.
pub struct RequestHandler<A> {
    api: Arc<A>,
    router: Router,
    handlers: HandlerTable<A>,
    authentication: Option<Arc<dyn AuthenticationContextProvider>>,
    max_body_bytes: usize,
}

impl<A: OpenApi> RequestHandler<A> {
    /// Generate the document for `A` with default options.
    pub fn new(api: A) -> Result<Self, GenerateError> {
        Self::with_generator(api, &OpenApiGenerator::default())
    }

    pub fn with_generator(api: A, generator: &OpenApiGenerator) -> Result<Self, GenerateError> {
        Ok(Self::from_generated(api, generator.build(A::definition())?))
    }

    /// Serve a document generated earlier, binding `A`'s handler functions by name.
    pub fn with_document(api: A, document: Arc<OpenApiDocument>) -> Self {
        let handlers = bind_handlers(A::definition());
        Self::assemble(api, document, handlers)
    }
}

impl<A: Send + Sync + 'static> RequestHandler<A> {
    pub fn from_generated(api: A, generated: GeneratedApi<A>) -> Self {
        let GeneratedApi { document, handlers } = generated;
        Self::assemble(api, Arc::new(document), handlers)
    }

    fn assemble(api: A, document: Arc<OpenApiDocument>, handlers: HandlerTable<A>) -> Self {
        for (_, _, operation) in document.operations() {
            if !handlers.contains_key(&operation.meta.handler_name) {
                warn!(
                    handler = %operation.meta.handler_name,
                    "Operation has no bound handler function"
                );
            }
        }
        Self {
            api: Arc::new(api),
            router: Router::new(document),
            handlers,
            authentication: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_authentication_provider<P>(mut self, provider: P) -> Self
    where
        P: AuthenticationContextProvider + 'static,
    {
        self.authentication = Some(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn with_runtime_config(self, config: &RuntimeConfig) -> Self {
        self.with_max_body_bytes(config.max_body_bytes)
    }

    #[must_use]
    pub fn document(&self) -> &Arc<OpenApiDocument> {
        self.router.document()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Serve one request.
    ///
    /// Request problems (404, 405, 401, 400) and handler failures (500) come
    /// back as `Ok` problem responses. `Err` means the router itself is
    /// misconfigured.
    pub fn handle(&self, request: &HttpRequest) -> Result<http::Response<Vec<u8>>, DispatchError> {
        let request_id = RequestId::from_header_or_new(
            request
                .headers()
                .get(RequestId::HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path()
        );
        let _entered = span.enter();
        let start = Instant::now();

        let mut handler_name = String::new();
        let response = match self.dispatch(request, &mut handler_name) {
            Ok(response) => response,
            Err(Failure::Request(err)) => {
                warn!(
                    status = err.status().as_u16(),
                    detail = %err.detail(),
                    issues = err.issues().len(),
                    "Request rejected"
                );
                ApiResponse::from(&err)
            }
            Err(Failure::Fatal(err)) => {
                error!(error = %err, "Dispatch failed");
                return Err(err);
            }
        };
        let response = response.with_header(RequestId::HEADER, request_id.to_string());

        info!(
            handler = %handler_name,
            status = response.status.as_u16(),
            body_bytes = response.body.len(),
            duration_us = start.elapsed().as_micros(),
            "Request handled"
        );
        response
            .into_http()
            .map_err(|e| DispatchError::InvalidResponse {
                handler: handler_name,
                reason: e.to_string(),
            })
    }

    fn dispatch(&self, request: &HttpRequest, handler_name: &mut String) -> Result<ApiResponse, Failure> {
        let route = self.router.route(request.method(), request.uri().path())?;
        let operation = route.operation;
        handler_name.push_str(route.handler_name());
        let incoming = IncomingRequest::new(request);
        let mut arguments = Arguments::new();

        let requirement = operation
            .security
            .as_ref()
            .or(self.router.document().security.as_ref());
        if let Some(requirement) = requirement {
            let provider = self.authentication.as_ref().ok_or_else(|| {
                DispatchError::MissingAuthenticationProvider {
                    handler: handler_name.clone(),
                }
            })?;
            match provider.authenticate(&incoming, requirement)? {
                Some(context) => {
                    debug!(scheme = %context.scheme, subject = %context.subject, "Authenticated");
                    if let Some(argument) = &operation.meta.authentication_argument {
                        arguments.set_authentication(argument.as_str(), context);
                    }
                }
                None if requirement.anonymous_access_allowed() => {
                    debug!("Anonymous access");
                }
                None => return Err(RequestError::unauthorized("").into()),
            }
        }

        if let Some(body) = &operation.request_body {
            if let Some(value) = self.parse_body(&incoming, body)? {
                arguments.insert(body.argument.as_str(), value);
            }
        }

        if let Some(parameters) = &operation.parameters {
            bind_parameters(&incoming, &route, parameters, &mut arguments)?;
        }

        let handler = self.handlers.get(route.handler_name()).ok_or_else(|| {
            DispatchError::UnboundHandler {
                handler: handler_name.clone(),
            }
        })?;
        debug!(handler = %handler_name, arguments = arguments.len(), "Invoking handler");

        let outcome = catch_unwind(AssertUnwindSafe(|| handler(self.api.as_ref(), &arguments)));
        match outcome {
            Ok(Ok(output)) => Ok(convert_output(handler_name, output)?),
            Ok(Err(err)) => {
                error!(handler = %handler_name, error = %format!("{err:#}"), "Handler failed");
                Ok(ProblemInternalServerErrorResponse::new().into_response())
            }
            Err(panic) => {
                error!(
                    handler = %handler_name,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                Ok(ProblemInternalServerErrorResponse::new().into_response())
            }
        }
    }

    fn parse_body(
        &self,
        incoming: &IncomingRequest<'_>,
        body: &RequestBody,
    ) -> Result<Option<Value>, RequestError> {
        let raw = incoming.body();
        if raw.len() > self.max_body_bytes {
            return Err(RequestError::bad_request(format!(
                "Request body exceeds the limit of {} bytes",
                self.max_body_bytes
            )));
        }
        if raw.is_empty() && body.required == Some(false) {
            return Ok(None);
        }

        let content_type = incoming
            .header("content-type")
            .ok_or_else(|| RequestError::bad_request("Missing \"Content-Type\" header"))?;
        let requested = MediaTypeRange::parse(content_type).map_err(|e| {
            RequestError::bad_request(format!("Invalid \"Content-Type\" header: {e}"))
        })?;
        let object = body.content.best_match(&requested).ok_or_else(|| {
            RequestError::bad_request(format!("Unsupported content type \"{}\"", requested.value))
        })?;
        if !requested.has_wildcard_subtype()
            && requested.subtype != "json"
            && !requested.subtype.ends_with("+json")
        {
            return Err(RequestError::bad_request(format!(
                "Unsupported content type \"{}\", only JSON bodies are accepted",
                requested.value
            )));
        }

        let parsed: Value = serde_json::from_slice(raw)
            .map_err(|e| RequestError::bad_request(format!("Failed to parse JSON body: {e}")))?;
        match &object.domain_schema {
            Some(schema) => schema
                .instantiate(&parsed)
                .map(Some)
                .map_err(|e| RequestError::invalid(e.issues)),
            None => Ok(Some(parsed)),
        }
    }
}

/// Collect every parameter issue before failing.
fn bind_parameters(
    incoming: &IncomingRequest<'_>,
    route: &RouteMatch<'_>,
    parameters: &[Parameter],
    arguments: &mut Arguments,
) -> Result<(), RequestError> {
    let mut issues: Vec<Issue> = Vec::new();
    for parameter in parameters {
        let name = parameter.name.as_str();
        let location = parameter.location.as_str();
        let Some(raw) = raw_parameter(incoming, route, parameter) else {
            if parameter.required {
                issues.push(Issue::required().prefixed([location, name]));
            }
            continue;
        };
        let value = match &parameter.meta.schema {
            Some(schema) => match schema.instantiate(&raw) {
                Ok(value) => value,
                Err(err) => {
                    issues.extend(
                        err.issues
                            .into_iter()
                            .map(|issue| issue.prefixed([location, name])),
                    );
                    continue;
                }
            },
            None => raw,
        };
        arguments.insert(parameter.meta.argument.as_str(), value);
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(RequestError::invalid(issues))
    }
}

fn raw_parameter(
    incoming: &IncomingRequest<'_>,
    route: &RouteMatch<'_>,
    parameter: &Parameter,
) -> Option<Value> {
    let name = parameter.name.as_str();
    let text = match parameter.location {
        ParameterLocation::Query => {
            if matches!(parameter.meta.schema, Some(Schema::List(_))) {
                let values: Vec<Value> = incoming
                    .query_all(name)
                    .map(|v| Value::String(v.to_string()))
                    .collect();
                return (!values.is_empty()).then_some(Value::Array(values));
            }
            incoming.query(name)
        }
        ParameterLocation::Path => route.get_path_param(name),
        ParameterLocation::Header => incoming.header(name),
        ParameterLocation::Cookie => incoming.cookie(name),
    };
    text.map(|t| Value::String(t.to_string()))
}

fn convert_output(handler: &str, output: HandlerOutput) -> Result<ApiResponse, DispatchError> {
    match output {
        HandlerOutput::Response(response) => Ok(response),
        HandlerOutput::Json(value @ (Value::Object(_) | Value::Array(_))) => {
            Ok(ApiResponse::json(StatusCode::OK, &value))
        }
        HandlerOutput::Json(other) => Err(DispatchError::UnsupportedResult {
            handler: handler.to_string(),
            reason: format!("expected a JSON object or array, got {other}"),
        }),
        HandlerOutput::Text(text) => Ok(ApiResponse::raw(StatusCode::OK, text)),
        HandlerOutput::Empty => Ok(ApiResponse::new(StatusCode::OK)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn bind_handlers<A>(definition: ApiDefinition<A>) -> HandlerTable<A> {
    definition
        .operations
        .into_iter()
        .filter_map(|op| op.handler.map(|handler| (op.name, handler)))
        .collect()
}

impl<A> fmt::Debug for RequestHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&String> = self.handlers.keys().collect();
        bound.sort();
        f.debug_struct("RequestHandler")
            .field("router", &self.router)
            .field("handlers", &bound)
            .field("authentication", &self.authentication.is_some())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
