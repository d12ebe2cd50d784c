//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from an entity descriptor.
//!
//! Identifiers (table and column names) come only from a validated `EntityDescriptor` and
//! are always double-quoted; every value is a positional parameter in `QueryBuf::params`.

use crate::config::EntityDescriptor;
use crate::service::Record;
use serde_json::Value;

/// Column used for the fixed newest-first list ordering.
pub const CREATED_AT: &str = "created_at";
/// Primary key column.
pub const ID: &str = "id";

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// SQL text plus its positional parameters; `params[i]` binds to `$i+1`.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// `$n`, cast to the field's configured column type when it has one.
fn placeholder(entity: &EntityDescriptor, field: &str, n: usize) -> String {
    match entity.column_type(field) {
        Some(pg_type) => format!("${}::{}", n, pg_type),
        None => format!("${}", n),
    }
}

/// All rows, newest first.
pub fn select_all(entity: &EntityDescriptor) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT * FROM {} ORDER BY {} DESC, {} DESC",
        quoted(entity.table()),
        quoted(CREATED_AT),
        quoted(ID)
    );
    q
}

/// One row by id; id is `$1`.
pub fn select_by_id(entity: &EntityDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!("SELECT * FROM {} WHERE {} = ${}", quoted(entity.table()), quoted(ID), n);
    q
}

/// INSERT of every declared field, in declaration order. Fields missing from `data` bind NULL.
pub fn insert(entity: &EntityDescriptor, data: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(entity.fields().len());
    let mut placeholders = Vec::with_capacity(entity.fields().len());
    for field in entity.fields() {
        let n = q.push_param(data.get(field).cloned().unwrap_or(Value::Null));
        cols.push(quoted(field));
        placeholders.push(placeholder(entity, field, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        quoted(entity.table()),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id: SET only declared fields present in `data`, walked in declaration order.
/// Id binds as `$1`, values from `$2` on. Returns None when no field is present, since an
/// empty SET clause is not valid SQL.
pub fn update(entity: &EntityDescriptor, id: i64, data: &Record) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let id_param = q.push_param(Value::from(id));
    let mut sets = Vec::new();
    for field in entity.fields() {
        let Some(v) = data.get(field) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(field), placeholder(entity, field, n)));
    }
    if sets.is_empty() {
        return None;
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
        quoted(entity.table()),
        sets.join(", "),
        quoted(ID),
        id_param
    );
    Some(q)
}

/// DELETE by id; id is `$1`. Caller checks the affected-row count.
pub fn delete(entity: &EntityDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!("DELETE FROM {} WHERE {} = ${}", quoted(entity.table()), quoted(ID), n);
    q
}
