//! # Typed Module
//!
//! Adapts handlers that work on plain request and response structs into the
//! untyped [`HandlerFn`] the dispatcher invokes.
//!
//! The whole [`Arguments`] map is deserialized into the request struct (the
//! authentication context appears under its argument name), and the response
//! is serialized back to JSON.
//!
//! ## Usage
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use typedapi::generator::{ArgumentDefinition, OperationDefinition, ReturnType};
//! use typedapi::typed::typed;
//!
//! struct Pets;
//!
//! #[derive(Deserialize)]
//! struct GetPet {
//!     id: i64,
//! }
//!
//! #[derive(Serialize)]
//! struct Pet {
//!     id: i64,
//!     name: String,
//! }
//!
//! let operation = OperationDefinition::<Pets>::get("getPet", "/pets/{id}")
//!     .argument(ArgumentDefinition::of::<i64>("id"))
//!     .returns(ReturnType::Void)
//!     .handler(typed(|_: &Pets, req: GetPet| {
//!         Ok(Pet { id: req.id, name: "Rex".to_string() })
//!     }));
//! assert_eq!(operation.name(), "getPet");
//! ```
//!
//! Stateful handlers can implement [`Handler`] instead and be bound with
//! [`into_handler_fn`].

use crate::dispatcher::Arguments;
use crate::generator::HandlerFn;
use crate::server::{HandlerError, HandlerOutput};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A handler working on typed values.
pub trait Handler<A>: Send + Sync + 'static {
    /// Deserialized from the coerced arguments.
    type Request: DeserializeOwned;
    /// Serialized into the response body.
    type Response: Serialize;

    fn handle(&self, api: &A, request: Self::Request) -> Result<Self::Response, HandlerError>;
}

/// Bind a [`Handler`] implementation.
pub fn into_handler_fn<A, H>(handler: H) -> HandlerFn<A>
where
    A: 'static,
    H: Handler<A>,
{
    Arc::new(move |api: &A, arguments: &Arguments| {
        let request: H::Request = arguments.into_typed()?;
        let response = handler.handle(api, request)?;
        render(&response)
    })
}

/// Adapt a closure taking a request struct and returning a serializable value.
///
/// The result can be passed to [`OperationDefinition::handler`](crate::generator::OperationDefinition::handler).
pub fn typed<A, Req, Resp, F>(
    f: F,
) -> impl Fn(&A, &Arguments) -> Result<HandlerOutput, HandlerError> + Send + Sync + 'static
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: Fn(&A, Req) -> Result<Resp, HandlerError> + Send + Sync + 'static,
{
    move |api: &A, arguments: &Arguments| {
        let request: Req = arguments.into_typed()?;
        let response = f(api, request)?;
        render(&response)
    }
}

/// `null` renders as an empty body and strings as text. Objects and arrays
/// become JSON; other scalars are left to the dispatcher to reject.
fn render<T: Serialize>(response: &T) -> Result<HandlerOutput, HandlerError> {
    Ok(match serde_json::to_value(response)? {
        Value::Null => HandlerOutput::Empty,
        Value::String(text) => HandlerOutput::Text(text),
        other => HandlerOutput::Json(other),
    })
}
