use crate::security::AuthenticationContext;
use crate::server::HandlerError;
use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Coerced handler arguments, keyed by argument name.
///
/// Optional parameters absent from the request are not present here; the
/// handler applies its own default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
    authentication: Option<(String, AuthenticationContext)>,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form, mostly for calling handlers directly in tests.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn set_authentication(&mut self, argument: impl Into<String>, context: AuthenticationContext) {
        self.authentication = Some((argument.into(), context));
    }

    /// Deserialize a required argument.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow!("argument \"{name}\" is missing"))?;
        T::deserialize(value).with_context(|| format!("argument \"{name}\" has an unexpected shape"))
    }

    /// Deserialize an argument that may be absent.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn authentication(&self) -> Option<&AuthenticationContext> {
        self.authentication.as_ref().map(|(_, ctx)| ctx)
    }

    /// Name of the argument bound to the authentication context.
    #[must_use]
    pub fn authentication_argument(&self) -> Option<&str> {
        self.authentication.as_ref().map(|(name, _)| name.as_str())
    }

    /// Deserialize every argument at once into a request struct. The
    /// authentication context is included under its argument name.
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let mut map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some((name, context)) = &self.authentication {
            map.insert(name.clone(), serde_json::to_value(context)?);
        }
        serde_json::from_value(Value::Object(map)).context("arguments do not match the request type")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
