//! CRUD factory, its cache decorator, and request validation.

mod cached;
mod crud;
mod validation;
pub use cached::CachedOperations;
pub use crud::{Ack, CrudOperations, Operations, WriteResult};
pub use validation::{RuleSchema, Schema, ROOT_FIELD};

/// A row as returned by the store: column name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Store-assigned numeric identifier.
pub type RecordId = i64;
