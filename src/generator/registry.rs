//! Domain schema to wire schema conversion with component deduplication.

use crate::schema::{Literal, Schema};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::trace;

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// `{"$ref": "#/components/schemas/<name>"}`
#[must_use]
pub fn reference(name: &str) -> Value {
    json!({ "$ref": format!("{COMPONENTS_PREFIX}{name}") })
}

/// Collects the named schemas met during generation.
///
/// Named constructs are rendered once, stored under their name and referenced
/// from then on. Literals and anonymous lists stay inline. Entries are stored
/// inner-first: a shape's property types land before the shape itself.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Value>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The wire schema to embed where `schema` is used.
    pub fn to_wire(&mut self, schema: &Schema) -> Value {
        match schema {
            Schema::Literal(literal) => literal_schema(*literal),
            Schema::List(list) if list.name.is_none() => {
                let mut out = Map::new();
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), self.to_wire(&list.item));
                insert_opt(&mut out, "minItems", list.min_count);
                insert_opt(&mut out, "maxItems", list.max_count);
                insert_opt(&mut out, "description", list.description.as_deref());
                Value::Object(out)
            }
            named => {
                let name = named.name().unwrap_or_default().to_string();
                if !self.schemas.contains_key(&name) {
                    let rendered = self.render(named);
                    trace!(schema = %name, "Registered component schema");
                    self.schemas.insert(name.clone(), rendered);
                }
                reference(&name)
            }
        }
    }

    fn render(&mut self, schema: &Schema) -> Value {
        let mut out = Map::new();
        match schema {
            Schema::Literal(literal) => return literal_schema(*literal),
            Schema::String(s) => {
                out.insert("type".into(), json!("string"));
                insert_opt(&mut out, "format", s.format.as_deref());
                insert_opt(&mut out, "minLength", s.min_length);
                insert_opt(&mut out, "maxLength", s.max_length);
                insert_opt(&mut out, "pattern", s.pattern.as_deref());
            }
            Schema::Integer(s) => {
                out.insert("type".into(), json!("integer"));
                insert_opt(&mut out, "minimum", s.minimum);
                insert_opt(&mut out, "maximum", s.maximum);
            }
            Schema::Float(s) => {
                out.insert("type".into(), json!("number"));
                insert_opt(&mut out, "minimum", s.minimum);
                insert_opt(&mut out, "maximum", s.maximum);
            }
            Schema::Enum(s) => {
                out.insert("type".into(), json!("string"));
                out.insert("enum".into(), json!(s.cases));
            }
            Schema::List(list) => {
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), self.to_wire(&list.item));
                insert_opt(&mut out, "minItems", list.min_count);
                insert_opt(&mut out, "maxItems", list.max_count);
            }
            Schema::Shape(shape) => {
                let mut properties = Map::new();
                for property in &shape.properties {
                    let mut wire = self.to_wire(&property.schema);
                    if let (Some(description), Value::Object(map)) =
                        (&property.description, &mut wire)
                    {
                        if !map.contains_key("$ref") {
                            map.insert("description".into(), json!(description));
                        }
                    }
                    properties.insert(property.name.clone(), wire);
                }
                let required: Vec<&str> = shape
                    .properties
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name.as_str())
                    .collect();
                out.insert("type".into(), json!("object"));
                out.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                out.insert("additionalProperties".into(), json!(false));
            }
            Schema::Interface(interface) => {
                let one_of: Vec<Value> = interface
                    .implementations
                    .iter()
                    .map(|implementation| self.to_wire(implementation))
                    .collect();
                out.insert("oneOf".into(), Value::Array(one_of));
                if let Some(discriminator) = &interface.discriminator {
                    let mapping: Map<String, Value> = discriminator
                        .mapping
                        .iter()
                        .map(|(id, type_name)| {
                            (id.clone(), json!(format!("{COMPONENTS_PREFIX}{type_name}")))
                        })
                        .collect();
                    out.insert(
                        "discriminator".into(),
                        json!({
                            "propertyName": discriminator.property_name,
                            "mapping": mapping,
                        }),
                    );
                }
            }
        }
        insert_opt(&mut out, "description", schema.description());
        Value::Object(out)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    #[must_use]
    pub fn into_schemas(self) -> IndexMap<String, Value> {
        self.schemas
    }
}

fn literal_schema(literal: Literal) -> Value {
    let type_ = match literal {
        Literal::String => "string",
        Literal::Boolean => "boolean",
        Literal::Integer => "integer",
        Literal::BoundedInteger { minimum, maximum } => {
            return json!({ "type": "integer", "minimum": minimum, "maximum": maximum });
        }
        Literal::Float => "number",
    };
    json!({ "type": type_ })
}

fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}
