//! Recipes and device queries

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A provisionable device template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub uuid: String,
    pub name: String,
}

impl Recipe {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipe of {} ({})", self.name, self.uuid)
    }
}

/// Caller-supplied device filter.
///
/// The driver never looks inside; it hands the query to the recipe resolver
/// and quotes it verbatim in diagnostics. Its string form is compact JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceQuery(Map<String, Value>);

impl DeviceQuery {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Query for a recipe by its uuid
    pub fn by_recipe_uuid(uuid: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("recipeUUID".to_string(), Value::String(uuid.to_string()));
        Self(fields)
    }

    /// Query for a recipe by its name
    pub fn by_recipe_name(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("recipeName".to_string(), Value::String(name.to_string()));
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn recipe_uuid(&self) -> Option<&str> {
        self.get("recipeUUID").and_then(Value::as_str)
    }

    pub fn recipe_name(&self) -> Option<&str> {
        self.get("recipeName").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for DeviceQuery {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl fmt::Display for DeviceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Serializing a map of JSON values cannot fail
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
