//! Domain schemas: the structural description of handler argument and
//! return types, independent of any wire format.
//!
//! Types describe themselves through [`Describe`]. Primitives map to
//! anonymous literal schemas that are always inlined; value objects declare a
//! named schema ([`StringSchema`], [`ShapeSchema`], ...) which the generator
//! registers once under `#/components/schemas/<name>` and references from
//! everywhere else.
//!
//! ```rust
//! use typedapi::schema::{Describe, ListSchema, Schema, ShapeSchema};
//!
//! struct Pet;
//!
//! impl Describe for Pet {
//!     fn schema() -> Schema {
//!         ShapeSchema::new("Pet")
//!             .property("id", i64::schema())
//!             .property("name", String::schema())
//!             .optional("tag", String::schema())
//!             .into()
//!     }
//! }
//!
//! let pets: Schema = ListSchema::named("Pets", Pet::schema()).min_count(1).into();
//! assert_eq!(pets.name(), Some("Pets"));
//! ```

mod coerce;

pub use coerce::{CoerceError, Issue, PathSegment};

/// Anonymous primitive kinds. Never registered as components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    String,
    Boolean,
    /// The full `i64` range.
    Integer,
    /// Narrower or unsigned integer types, inclusive bounds.
    BoundedInteger { minimum: i64, maximum: u64 },
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Literal(Literal),
    String(StringSchema),
    Integer(IntegerSchema),
    Float(FloatSchema),
    Enum(EnumSchema),
    List(ListSchema),
    Shape(ShapeSchema),
    Interface(InterfaceSchema),
}

impl Schema {
    /// The component name, `None` for literals and anonymous lists.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Literal(_) => None,
            Schema::String(s) => Some(&s.name),
            Schema::Integer(s) => Some(&s.name),
            Schema::Float(s) => Some(&s.name),
            Schema::Enum(s) => Some(&s.name),
            Schema::List(s) => s.name.as_deref(),
            Schema::Shape(s) => Some(&s.name),
            Schema::Interface(s) => Some(&s.name),
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Schema::Literal(_) => None,
            Schema::String(s) => s.description.as_deref(),
            Schema::Integer(s) => s.description.as_deref(),
            Schema::Float(s) => s.description.as_deref(),
            Schema::Enum(s) => s.description.as_deref(),
            Schema::List(s) => s.description.as_deref(),
            Schema::Shape(s) => s.description.as_deref(),
            Schema::Interface(s) => s.description.as_deref(),
        }
    }
}

/// Implemented by every type that can appear as a handler argument or result.
pub trait Describe {
    fn schema() -> Schema;

    /// `true` when a missing value is acceptable (`Option<T>`).
    fn optional() -> bool {
        false
    }
}

macro_rules! describe_literal {
    ($kind:ident => $($t:ty),+) => {
        $(
            impl Describe for $t {
                fn schema() -> Schema {
                    Schema::Literal(Literal::$kind)
                }
            }
        )+
    };
}

describe_literal!(String => String, &str);
describe_literal!(Boolean => bool);
describe_literal!(Integer => i64);

macro_rules! describe_bounded_integer {
    ($($t:ty),+) => {
        $(
            impl Describe for $t {
                fn schema() -> Schema {
                    Schema::Literal(Literal::BoundedInteger {
                        minimum: <$t>::MIN as i64,
                        maximum: <$t>::MAX as u64,
                    })
                }
            }
        )+
    };
}

describe_bounded_integer!(i8, i16, i32, isize, u8, u16, u32, u64, usize);
describe_literal!(Float => f32, f64);

impl<T: Describe> Describe for Option<T> {
    fn schema() -> Schema {
        T::schema()
    }

    fn optional() -> bool {
        true
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn schema() -> Schema {
        ListSchema::anonymous(T::schema()).into()
    }
}

/// A named string value object, e.g. an email address.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringSchema {
    pub name: String,
    pub description: Option<String>,
    pub format: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

impl StringSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Known formats (`email`, `uri`, `date`) are checked during coercion.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegerSchema {
    pub name: String,
    pub description: Option<String>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl IntegerSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn minimum(mut self, min: i64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: i64) -> Self {
        self.maximum = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatSchema {
    pub name: String,
    pub description: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl FloatSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }
}

/// A closed set of symbolic names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumSchema {
    pub name: String,
    pub description: Option<String>,
    pub cases: Vec<String>,
}

impl EnumSchema {
    pub fn new<I, S>(name: impl Into<String>, cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            cases: cases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A homogeneous list. Named lists are components, anonymous ones are inlined.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSchema {
    pub name: Option<String>,
    pub description: Option<String>,
    pub item: Box<Schema>,
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
}

impl ListSchema {
    pub fn named(name: impl Into<String>, item: Schema) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::anonymous(item)
        }
    }

    pub fn anonymous(item: Schema) -> Self {
        Self {
            name: None,
            description: None,
            item: Box::new(item),
            min_count: None,
            max_count: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min_count(mut self, min: usize) -> Self {
        self.min_count = Some(min);
        self
    }

    pub fn max_count(mut self, max: usize) -> Self {
        self.max_count = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
    pub description: Option<String>,
}

/// An object with a fixed set of properties. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeSchema {
    pub name: String,
    pub description: Option<String>,
    pub properties: Vec<Property>,
}

impl ShapeSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn property(self, name: impl Into<String>, schema: Schema) -> Self {
        self.push(name.into(), schema, true, None)
    }

    pub fn optional(self, name: impl Into<String>, schema: Schema) -> Self {
        self.push(name.into(), schema, false, None)
    }

    /// Adds a property whose requiredness follows `T` (`Option<_>` is optional).
    pub fn field<T: Describe>(self, name: impl Into<String>) -> Self {
        self.push(name.into(), T::schema(), !T::optional(), None)
    }

    pub fn described(
        self,
        name: impl Into<String>,
        schema: Schema,
        description: impl Into<String>,
    ) -> Self {
        self.push(name.into(), schema, true, Some(description.into()))
    }

    fn push(
        mut self,
        name: String,
        schema: Schema,
        required: bool,
        description: Option<String>,
    ) -> Self {
        self.properties.push(Property {
            name,
            schema,
            required,
            description,
        });
        self
    }
}

/// Maps discriminator values to implementation names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discriminator {
    pub property_name: String,
    pub mapping: Vec<(String, String)>,
}

/// A tagged union over several implementations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceSchema {
    pub name: String,
    pub description: Option<String>,
    pub implementations: Vec<Schema>,
    pub discriminator: Option<Discriminator>,
}

impl InterfaceSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Registers an implementation, selected by `discriminator_value` when a
    /// discriminator property has been declared.
    pub fn implementation(mut self, discriminator_value: impl Into<String>, schema: Schema) -> Self {
        if let (Some(discriminator), Some(name)) = (self.discriminator.as_mut(), schema.name()) {
            discriminator
                .mapping
                .push((discriminator_value.into(), name.to_string()));
        }
        self.implementations.push(schema);
        self
    }

    /// Must be called before adding implementations.
    pub fn discriminator(mut self, property_name: impl Into<String>) -> Self {
        self.discriminator = Some(Discriminator {
            property_name: property_name.into(),
            mapping: Vec::new(),
        });
        self
    }
}

macro_rules! into_schema {
    ($($variant:ident($t:ty)),+) => {
        $(
            impl From<$t> for Schema {
                fn from(value: $t) -> Self {
                    Schema::$variant(value)
                }
            }
        )+
    };
}

into_schema!(
    Literal(Literal),
    String(StringSchema),
    Integer(IntegerSchema),
    Float(FloatSchema),
    Enum(EnumSchema),
    List(ListSchema),
    Shape(ShapeSchema),
    Interface(InterfaceSchema)
);
