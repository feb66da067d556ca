#![allow(dead_code)]

//! Fixture APIs shared by the integration tests.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use typedapi::generator::{
    ApiDefinition, ArgumentDefinition, OpenApi, OperationDefinition, ReturnType,
};
use typedapi::schema::{
    Describe, IntegerSchema, InterfaceSchema, ListSchema, Schema, ShapeSchema, StringSchema,
};
use typedapi::server::{HandlerOutput, NotFoundResponse, OkResponse};
use typedapi::spec::{ApiKeyLocation, ParameterLocation, SecurityRequirement, SecurityScheme};

pub mod http_util {
    use serde_json::Value;

    pub fn request(method: &str, uri: &str) -> http::Request<Vec<u8>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    pub fn json_request(method: &str, uri: &str, body: &Value) -> http::Request<Vec<u8>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.to_string().into_bytes())
            .unwrap()
    }

    pub fn with_header(
        mut request: http::Request<Vec<u8>>,
        name: &'static str,
        value: &str,
    ) -> http::Request<Vec<u8>> {
        request
            .headers_mut()
            .append(name, value.parse().unwrap());
        request
    }

    pub fn body_json(response: &http::Response<Vec<u8>>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    pub fn content_type(response: &http::Response<Vec<u8>>) -> Option<&str> {
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
    }
}

// --- Pet store -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Describe for Pet {
    fn schema() -> Schema {
        ShapeSchema::new("Pet")
            .field::<i64>("id")
            .field::<String>("name")
            .field::<Option<String>>("tag")
            .into()
    }
}

pub struct Pets;

impl Describe for Pets {
    fn schema() -> Schema {
        ListSchema::named("Pets", Pet::schema())
            .min_count(1)
            .max_count(10)
            .into()
    }
}

pub struct PetStoreApi {
    pub pets: Vec<Pet>,
}

impl PetStoreApi {
    pub fn new() -> Self {
        let pet = |id, name: &str, tag: Option<&str>| Pet {
            id,
            name: name.to_string(),
            tag: tag.map(str::to_string),
        };
        Self {
            pets: vec![
                pet(1, "First", None),
                pet(2, "Second", Some("some-tag")),
                pet(3, "Third", Some("some-other-tag")),
            ],
        }
    }
}

impl OpenApi for PetStoreApi {
    fn definition() -> ApiDefinition<Self> {
        ApiDefinition::new()
            .title("Pet Store API")
            .version("1.0.0")
            .operation(
                OperationDefinition::get("pets", "/pet/findByStatus")
                    .description("Operation description")
                    .returns(ReturnType::of::<Pets>())
                    .handler(|api: &PetStoreApi, _| HandlerOutput::json(&api.pets)),
            )
            .operation(
                OperationDefinition::get("petById", "/pet/{id}")
                    .argument(ArgumentDefinition::of::<i64>("id"))
                    .returns(ReturnType::of::<Pet>().or(ReturnType::response::<NotFoundResponse>()))
                    .handler(|api: &PetStoreApi, args| {
                        let id: i64 = args.get("id")?;
                        match api.pets.iter().find(|pet| pet.id == id) {
                            Some(pet) => HandlerOutput::json(pet),
                            None => Ok(HandlerOutput::wrap(NotFoundResponse::new())),
                        }
                    }),
            )
    }
}

// --- Interface schemas -----------------------------------------------------

fn email_address() -> Schema {
    StringSchema::new("EmailAddress").format("email").into()
}

pub fn some_interface() -> Schema {
    InterfaceSchema::new("SomeInterface")
        .discriminator("type")
        .implementation(
            "a",
            ShapeSchema::new("ImplementationA")
                .field::<String>("someString")
                .property("emailAddress", email_address())
                .into(),
        )
        .implementation(
            "b",
            ShapeSchema::new("ImplementationB")
                .field::<bool>("someBoolean")
                .property("emailAddress", email_address())
                .into(),
        )
        .into()
}

pub struct AnotherApi;

impl OpenApi for AnotherApi {
    fn definition() -> ApiDefinition<Self> {
        ApiDefinition::new().operation(
            OperationDefinition::patch("someInterface", "/some-interface")
                .summary("Operation summary")
                .description("Operation description")
                .returns(ReturnType::schema(some_interface()))
                .handler(|_: &AnotherApi, _| {
                    Ok(HandlerOutput::Json(json!({
                        "type": "a",
                        "someString": "x",
                        "emailAddress": "a@example.com"
                    })))
                }),
        )
    }
}

// --- Parameters ------------------------------------------------------------

pub struct ApiWithParameters;

impl OpenApi for ApiWithParameters {
    fn definition() -> ApiDefinition<Self> {
        let query = || {
            ArgumentDefinition::of::<String>("queryParam")
                .location(ParameterLocation::Query)
                .named("query-param")
        };
        let header = || {
            ArgumentDefinition::of::<i64>("headerParam")
                .location(ParameterLocation::Header)
                .named("X-Header-Param")
        };
        let cookie = || {
            ArgumentDefinition::of::<bool>("cookieParam")
                .location(ParameterLocation::Cookie)
                .named("Cookie-Param")
        };
        ApiDefinition::new()
            .operation(
                OperationDefinition::get("requiredParams", "/required-params")
                    .argument(query())
                    .argument(header())
                    .argument(cookie())
                    .returns(ReturnType::Void)
                    .handler(|_: &ApiWithParameters, args| echo(args)),
            )
            .operation(
                OperationDefinition::get("optionalParams", "/optional-params")
                    .argument(query().default("default"))
                    .argument(header().default(123))
                    .argument(cookie().default(true))
                    .returns(ReturnType::Void)
                    .handler(|_: &ApiWithParameters, args| echo(args)),
            )
    }
}

pub struct ApiWithEmptyObject;

impl OpenApi for ApiWithEmptyObject {
    fn definition() -> ApiDefinition<Self> {
        ApiDefinition::new().operation(
            OperationDefinition::post("emptyObject", "/empty-object")
                .argument(ArgumentDefinition::with_schema(
                    "emptyObject",
                    ShapeSchema::new("EmptyObject"),
                ))
                .returns(ReturnType::Void)
                .handler(|_: &ApiWithEmptyObject, _| Ok(HandlerOutput::Empty)),
        )
    }
}

/// Every bound argument as one JSON object.
pub fn echo(args: &typedapi::Arguments) -> Result<HandlerOutput, typedapi::server::HandlerError> {
    let map: Map<String, Value> = args
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    Ok(HandlerOutput::Json(Value::Object(map)))
}

// --- Dispatcher fixture ----------------------------------------------------

pub const API_KEY: &str = "key-123";
pub const BEARER_TOKEN: &str = "token-abc";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: i64,
}

impl Describe for Item {
    fn schema() -> Schema {
        ShapeSchema::new("Item")
            .property("name", StringSchema::new("ItemName").min_length(1).into())
            .property(
                "quantity",
                IntegerSchema::new("Quantity").minimum(0).maximum(1000).into(),
            )
            .into()
    }
}

fn tag() -> Schema {
    StringSchema::new("Tag").pattern("^[a-z]+$").into()
}

fn limit() -> Schema {
    IntegerSchema::new("Limit").minimum(1).maximum(50).into()
}

/// Covers every parameter location, bodies, security and result shapes.
pub struct EchoApi;

impl OpenApi for EchoApi {
    fn definition() -> ApiDefinition<Self> {
        ApiDefinition::new()
            .title("Echo")
            .version("2.0.0")
            .security_scheme(
                "apiKey",
                SecurityScheme::api_key("X-Api-Key", ApiKeyLocation::Header),
            )
            .security_scheme("bearer", SecurityScheme::bearer(None))
            .security_scheme("basic", SecurityScheme::basic())
            .operation(
                OperationDefinition::get("search", "/search")
                    .argument(ArgumentDefinition::with_schema("tag", tag()))
                    .argument(ArgumentDefinition::with_schema("limit", limit()).optional())
                    .argument(ArgumentDefinition::of::<Option<Vec<String>>>("colors"))
                    .argument(
                        ArgumentDefinition::of::<Option<String>>("trace")
                            .location(ParameterLocation::Header)
                            .named("X-Trace"),
                    )
                    .argument(
                        ArgumentDefinition::of::<Option<String>>("session")
                            .location(ParameterLocation::Cookie),
                    )
                    .returns(ReturnType::schema(ShapeSchema::new("SearchResult")))
                    .handler(|_: &EchoApi, args| echo(args)),
            )
            .operation(
                OperationDefinition::post("createItem", "/items")
                    .argument(ArgumentDefinition::of::<Item>("item"))
                    .returns(ReturnType::of::<Item>())
                    .handler(|_: &EchoApi, args| {
                        let item: Item = args.get("item")?;
                        HandlerOutput::json(&item)
                    }),
            )
            .operation(
                OperationDefinition::put("updateItem", "/items/{id}")
                    .argument(ArgumentDefinition::of::<i64>("id"))
                    .argument(ArgumentDefinition::of::<Option<Item>>("item"))
                    .returns(ReturnType::of::<Item>())
                    .handler(|_: &EchoApi, args| echo(args)),
            )
            .operation(
                OperationDefinition::get("fail", "/fail")
                    .returns(ReturnType::Void)
                    .handler(|_: &EchoApi, _| Err(anyhow!("database is down"))),
            )
            .operation(
                OperationDefinition::get("explode", "/explode")
                    .returns(ReturnType::Void)
                    .handler(|_: &EchoApi, _| panic!("handler exploded")),
            )
            .operation(
                OperationDefinition::get("ping", "/ping")
                    .returns(ReturnType::of::<String>())
                    .handler(|_: &EchoApi, _| Ok(HandlerOutput::Text("pong".to_string()))),
            )
            .operation(
                OperationDefinition::get("nothing", "/nothing")
                    .returns(ReturnType::Null)
                    .handler(|_: &EchoApi, _| Ok(HandlerOutput::Empty)),
            )
            .operation(
                OperationDefinition::get("scalar", "/scalar")
                    .returns(ReturnType::of::<i64>())
                    .handler(|_: &EchoApi, _| Ok(HandlerOutput::Json(json!(42)))),
            )
            .operation(
                OperationDefinition::get("me", "/me")
                    .security(SecurityRequirement::scheme("apiKey").or_scheme("bearer"))
                    .argument(ArgumentDefinition::authentication("auth"))
                    .returns(ReturnType::Void)
                    .handler(|_: &EchoApi, args| {
                        let auth = args
                            .authentication()
                            .ok_or_else(|| anyhow!("no authentication context"))?;
                        Ok(HandlerOutput::Json(json!({
                            "scheme": auth.scheme,
                            "subject": auth.subject,
                            "argument": args.authentication_argument(),
                        })))
                    }),
            )
            .operation(
                OperationDefinition::get("greeting", "/greeting")
                    .security(SecurityRequirement::scheme("basic").or_anonymous())
                    .argument(ArgumentDefinition::authentication("auth"))
                    .returns(ReturnType::Void)
                    .handler(|_: &EchoApi, args| {
                        let name = args
                            .authentication()
                            .map_or("stranger", |ctx| ctx.subject.as_str());
                        Ok(HandlerOutput::Text(format!("Hello, {name}")))
                    }),
            )
            .operation(
                OperationDefinition::get("price", "/price")
                    .argument(ArgumentDefinition::of::<f64>("value"))
                    .argument(ArgumentDefinition::of::<Option<u32>>("limit"))
                    .returns(ReturnType::schema(ShapeSchema::new("PriceResult")))
                    .handler(|_: &EchoApi, args| echo(args)),
            )
            .operation(
                OperationDefinition::get("cookies", "/cookies")
                    .returns(ReturnType::response::<OkResponse>())
                    .handler(|_: &EchoApi, _| {
                        Ok(HandlerOutput::wrap(
                            OkResponse::new()
                                .with_header("Set-Cookie", "a=1")
                                .with_header("Set-Cookie", "b=2"),
                        ))
                    }),
            )
            .operation(
                OperationDefinition::delete("purge", "/items")
                    .security(SecurityRequirement::scoped("apiKey", ["items:admin"]))
                    .returns(ReturnType::Void)
                    .handler(|_: &EchoApi, _| Ok(HandlerOutput::Empty)),
            )
    }
}
