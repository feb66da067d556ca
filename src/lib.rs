//! # typedapi
//!
//! **typedapi** derives an [OpenAPI 3.0](https://spec.openapis.org/oas/v3.0.3)
//! document from typed handler definitions and routes HTTP requests to those
//! handlers, coercing path, query, header, cookie and body input into the
//! declared types on the way in.
//!
//! ## Overview
//!
//! An API is a Rust type implementing [`OpenApi`]. Its
//! [`definition`](OpenApi::definition) lists the operations: path template,
//! method, arguments with their domain schemas, return type and the handler
//! function. From that single definition the crate builds
//!
//! - the published document, with every named schema registered once under
//!   `#/components/schemas`
//! - a router that matches concrete paths before overlapping templates and
//!   rejects ambiguous templates when the document is built
//! - a dispatcher that authenticates, validates and invokes the handler, and
//!   answers every request problem with an `application/problem+json` body
//!
//! ## Architecture
//!
//! - **[`schema`]** - Domain schemas and coercion of loosely typed input
//! - **[`media_type`]** - Media type ranges and content negotiation
//! - **[`spec`]** - The OpenAPI object model, path templates and the path table
//! - **[`generator`]** - Builds the document from an [`ApiDefinition`]
//! - **[`router`]** - Matches method and path against the path table
//! - **[`dispatcher`]** - Binds arguments and invokes handler functions
//! - **[`server`]** - Request view and response types at the HTTP boundary
//! - **[`security`]** - Authentication context providers
//! - **[`typed`]** - Adapters for handlers on plain request and response structs
//!
//! ## Quick Start
//!
//! ```rust
//! use typedapi::generator::{ApiDefinition, ArgumentDefinition, OpenApi, OperationDefinition, ReturnType};
//! use typedapi::server::HandlerOutput;
//! use typedapi::RequestHandler;
//!
//! struct Greeter;
//!
//! impl OpenApi for Greeter {
//!     fn definition() -> ApiDefinition<Self> {
//!         ApiDefinition::new().title("Greeter").version("1.0.0").operation(
//!             OperationDefinition::get("greet", "/greet/{name}")
//!                 .argument(ArgumentDefinition::of::<String>("name"))
//!                 .returns(ReturnType::of::<String>())
//!                 .handler(|_: &Greeter, args| {
//!                     let name: String = args.get("name")?;
//!                     Ok(HandlerOutput::Text(format!("Hello, {name}")))
//!                 }),
//!         )
//!     }
//! }
//!
//! let handler = RequestHandler::new(Greeter).unwrap();
//! let request = http::Request::builder().uri("/greet/Ann").body(Vec::new()).unwrap();
//! let response = handler.handle(&request).unwrap();
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body(), b"Hello, Ann");
//! ```
//!
//! ## Logging
//!
//! Every component emits [`tracing`] events. The binary installs a subscriber
//! through [`logging::init_logging`], configured from the environment by
//! [`runtime_config::RuntimeConfig`].

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod ids;
pub mod logging;
pub mod media_type;
pub mod router;
pub mod runtime_config;
pub mod schema;
pub mod security;
pub mod server;
pub mod spec;
pub mod typed;

pub use dispatcher::{Arguments, RequestHandler};
pub use error::{DispatchError, GenerateError, RequestError};
pub use generator::{ApiDefinition, OpenApi, OpenApiGenerator};
pub use media_type::MediaTypeRange;
pub use schema::{Describe, Schema};
pub use security::{AuthenticationContext, AuthenticationContextProvider};
pub use spec::{OpenApiDocument, PathTable, RelativePath, SecurityRequirement, SecurityScheme};
