//! Raw config types matching the entities JSON file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Expected JSON type of a field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default, rename = "type")]
    pub type_: Option<FieldType>,
    #[serde(default)]
    pub required: Option<bool>,
    /// Custom message for a missing required value (defaults to "Required").
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// One entity: registry name, backing table, ordered writable fields, per-field rules.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub table: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    /// PostgreSQL type per field (e.g. `uuid`, `timestamptz`, `numeric(10,2)`). Written
    /// values are cast to it, so string input reaches non-text columns.
    #[serde(default)]
    pub column_types: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntitiesFile {
    pub entities: Vec<EntityConfig>,
}
