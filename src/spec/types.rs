use super::paths::PathTable;
use super::security::{SecurityRequirement, SecurityScheme};
use crate::error::GenerateError;
use crate::media_type::MediaTypeRange;
use crate::schema::Schema;
use http::Method;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";
pub const DEFAULT_API_VERSION: &str = "0.0.0";

/// The generated API description. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    pub paths: PathTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityRequirement>,
}

impl OpenApiDocument {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Iterate every operation in table order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, Method, &Operation)> {
        self.paths.iter().flat_map(|entry| {
            entry
                .item
                .operations()
                .map(move |(method, op)| (entry.path.as_str(), method, op))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<IndexMap<String, SecurityScheme>>,
}

/// The operations of one path template, at most one per method.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    const METHODS: [Method; 8] = [
        Method::GET,
        Method::PUT,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
        Method::HEAD,
        Method::PATCH,
        Method::TRACE,
    ];

    fn slot(&self, method: &Method) -> Option<&Option<Operation>> {
        Some(match *method {
            Method::GET => &self.get,
            Method::PUT => &self.put,
            Method::POST => &self.post,
            Method::DELETE => &self.delete,
            Method::OPTIONS => &self.options,
            Method::HEAD => &self.head,
            Method::PATCH => &self.patch,
            Method::TRACE => &self.trace,
            _ => return None,
        })
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<Operation>> {
        Some(match *method {
            Method::GET => &mut self.get,
            Method::PUT => &mut self.put,
            Method::POST => &mut self.post,
            Method::DELETE => &mut self.delete,
            Method::OPTIONS => &mut self.options,
            Method::HEAD => &mut self.head,
            Method::PATCH => &mut self.patch,
            Method::TRACE => &mut self.trace,
            _ => return None,
        })
    }

    #[must_use]
    pub fn operation(&self, method: &Method) -> Option<&Operation> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Store `operation` under `method`, handing back the operation it displaced.
    ///
    /// Returns `Err(operation)` for methods OpenAPI has no slot for.
    pub fn set(&mut self, method: &Method, operation: Operation) -> Result<Option<Operation>, Operation> {
        match self.slot_mut(method) {
            Some(slot) => Ok(slot.replace(operation)),
            None => Err(operation),
        }
    }

    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        Self::METHODS
            .into_iter()
            .filter_map(move |m| self.operation(&m).map(|op| (m, op)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations().next().is_none()
    }
}

/// Router-only bookkeeping attached to an [`Operation`]. Never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationMeta {
    /// Name of the handler function bound to this operation.
    pub handler_name: String,
    /// Argument receiving the authentication context, if any.
    pub authentication_argument: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: Responses,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityRequirement>,
    #[serde(skip)]
    pub meta: OperationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

impl ParameterLocation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

/// Router-only bookkeeping attached to a [`Parameter`]. Never serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMeta {
    /// Domain schema the raw value is coerced through.
    pub schema: Option<Schema>,
    /// Handler argument the coerced value binds to.
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip)]
    pub meta: ParameterMeta,
}

impl Parameter {
    /// Path parameters must be required.
    ///
    /// A `default` is folded into inline schemas; referenced schemas are
    /// left untouched since `$ref` siblings are ignored.
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        required: bool,
        schema: Option<Value>,
        default: Option<Value>,
    ) -> Result<Self, GenerateError> {
        let name = name.into();
        if location == ParameterLocation::Path && !required {
            return Err(GenerateError::InvalidParameter {
                name,
                reason: "parameter of location \"path\" must be required".to_string(),
            });
        }
        let schema = match (schema, default) {
            (Some(Value::Object(mut map)), Some(default)) if !map.contains_key("$ref") => {
                map.insert("default".to_string(), default);
                Some(Value::Object(map))
            }
            (schema, _) => schema,
        };
        Ok(Self {
            meta: ParameterMeta {
                schema: None,
                argument: name.clone(),
            },
            name,
            location,
            description: None,
            required,
            deprecated: None,
            style: None,
            explode: None,
            schema,
        })
    }

    #[must_use]
    pub fn with_meta(mut self, meta: ParameterMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaTypeObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Domain schema the parsed body is coerced through. Never serialized.
    #[serde(skip)]
    pub domain_schema: Option<Schema>,
}

/// Media type range to content description, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMap(Vec<(MediaTypeRange, MediaTypeObject)>);

impl ContentMap {
    #[must_use]
    pub fn with(mut self, range: MediaTypeRange, object: MediaTypeObject) -> Self {
        if let Some(slot) = self.0.iter_mut().find(|(r, _)| r.value == range.value) {
            slot.1 = object;
        } else {
            self.0.push((range, object));
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MediaTypeRange, &MediaTypeObject)> {
        self.0.iter().map(|(r, o)| (r, o))
    }

    /// See [`MediaTypeRange::best_match`].
    #[must_use]
    pub fn best_match(&self, requested: &MediaTypeRange) -> Option<&MediaTypeObject> {
        MediaTypeRange::best_match(self.iter(), requested)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ContentMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (range, object) in &self.0 {
            map.serialize_entry(&range.value, object)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: ContentMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Handler argument the body binds to. Never serialized.
    #[serde(skip)]
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseObject {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentMap>,
}

impl ResponseObject {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            headers: None,
            content: None,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentMap) -> Self {
        self.content = Some(content);
        self
    }
}

/// Status code (or `default`) to response, built incrementally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    by_status: IndexMap<u16, ResponseObject>,
    default: Option<ResponseObject>,
}

impl Responses {
    #[must_use]
    pub fn with(mut self, status: u16, response: ResponseObject) -> Self {
        self.by_status.insert(status, response);
        self
    }

    #[must_use]
    pub fn with_default(mut self, response: ResponseObject) -> Self {
        self.default = Some(response);
        self
    }

    #[must_use]
    pub fn has_status(&self, status: u16) -> bool {
        self.by_status.contains_key(&status)
    }

    #[must_use]
    pub fn get(&self, status: u16) -> Option<&ResponseObject> {
        self.by_status.get(&status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ResponseObject)> {
        self.by_status.iter().map(|(s, r)| (*s, r))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_status.is_empty() && self.default.is_none()
    }
}

impl Serialize for Responses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut statuses: Vec<_> = self.by_status.iter().collect();
        statuses.sort_by_key(|(status, _)| **status);
        let len = statuses.len() + usize::from(self.default.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (status, response) in statuses {
            map.serialize_entry(&status.to_string(), response)?;
        }
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_parameter_must_be_required() {
        let err = Parameter::new("id", ParameterLocation::Path, false, None, None).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter { .. }));
    }

    #[test]
    fn test_default_is_folded_into_inline_schema_only() {
        let p = Parameter::new(
            "limit",
            ParameterLocation::Query,
            false,
            Some(json!({"type": "integer"})),
            Some(json!(10)),
        )
        .unwrap();
        assert_eq!(p.schema, Some(json!({"type": "integer", "default": 10})));

        let p = Parameter::new(
            "status",
            ParameterLocation::Query,
            false,
            Some(json!({"$ref": "#/components/schemas/PetStatus"})),
            Some(json!("available")),
        )
        .unwrap();
        assert_eq!(p.schema, Some(json!({"$ref": "#/components/schemas/PetStatus"})));
    }

    #[test]
    fn test_parameter_meta_is_not_serialized() {
        let p = Parameter::new("q", ParameterLocation::Query, true, None, None)
            .unwrap()
            .with_meta(ParameterMeta {
                schema: None,
                argument: "query".to_string(),
            });
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"name": "q", "in": "query", "required": true})
        );
    }

    #[test]
    fn test_responses_serialize_sorted_with_default_last() {
        let responses = Responses::default()
            .with(404, ResponseObject::new("Not Found"))
            .with(200, ResponseObject::new("Default"))
            .with_default(ResponseObject::new("Unexpected"));
        assert!(responses.has_status(404));
        assert!(!responses.has_status(400));
        let text = serde_json::to_string(&responses).unwrap();
        assert_eq!(
            text,
            r#"{"200":{"description":"Default"},"404":{"description":"Not Found"},"default":{"description":"Unexpected"}}"#
        );
    }

    #[test]
    fn test_path_item_slots() {
        let op = Operation {
            summary: None,
            description: None,
            operation_id: Some("pet".to_string()),
            tags: None,
            parameters: None,
            request_body: None,
            responses: Responses::default(),
            deprecated: None,
            security: None,
            meta: OperationMeta::default(),
        };
        let mut item = PathItem::default();
        assert!(item.set(&Method::GET, op.clone()).unwrap().is_none());
        assert!(item.set(&Method::GET, op.clone()).unwrap().is_some());
        assert!(item.set(&Method::CONNECT, op).is_err());
        let methods: Vec<_> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(methods, vec![Method::GET]);
    }
}
