//! Resolved entity descriptors: config validated and flattened for runtime use.

use crate::config::validator::{check_column_types, check_columns};
use crate::error::ConfigError;
use crate::service::Schema;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything the CRUD factory needs for one entity. Immutable once built.
#[derive(Clone)]
pub struct EntityDescriptor {
    table: String,
    schema: Arc<dyn Schema>,
    fields: Vec<String>,
    column_types: HashMap<String, String>,
}

impl EntityDescriptor {
    /// Build a descriptor, checking the invariants the SQL builder relies on: table and
    /// fields are plain identifiers, fields are non-empty and unique.
    pub fn new(
        table: impl Into<String>,
        schema: Arc<dyn Schema>,
        fields: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let table = table.into();
        check_columns(&table, &table, &fields)?;
        Ok(Self {
            table,
            schema,
            fields,
            column_types: HashMap::new(),
        })
    }

    /// Attach PostgreSQL column types; written values for these fields are cast to them.
    pub fn with_column_types(mut self, column_types: HashMap<String, String>) -> Result<Self, ConfigError> {
        check_column_types(&self.table, &self.fields, &column_types)?;
        self.column_types = column_types;
        Ok(self)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &dyn Schema {
        self.schema.as_ref()
    }

    /// Writable columns in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn column_type(&self, field: &str) -> Option<&str> {
        self.column_types.get(field).map(String::as_str)
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("column_types", &self.column_types)
            .finish_non_exhaustive()
    }
}

/// Name plus descriptor, in configuration order.
#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub descriptor: EntityDescriptor,
}
