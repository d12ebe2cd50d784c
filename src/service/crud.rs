//! The CRUD factory: one entity descriptor in, five bound operations out.

use crate::config::EntityDescriptor;
use crate::error::{AppError, ValidationErrors};
use crate::service::{Record, RecordId};
use crate::sql::{self, QueryBuf, ID};
use crate::store::Executor;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// `{success, data}` envelope returned by create and update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WriteResult {
    pub success: bool,
    pub data: Record,
}

impl WriteResult {
    fn ok(data: Record) -> Self {
        Self { success: true, data }
    }
}

/// Bare acknowledgment returned by delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
}

/// The five operations bound to one entity.
#[async_trait]
pub trait Operations: Send + Sync {
    /// Table name of the bound entity.
    fn table(&self) -> &str;

    /// Every record, newest first.
    async fn get_all(&self) -> Result<Vec<Record>, AppError>;

    async fn get_by_id(&self, id: RecordId) -> Result<Record, AppError>;

    /// Validate `input` against the full write schema, then insert.
    async fn create(&self, input: &Value) -> Result<WriteResult, AppError>;

    /// `input` is `{id, ...fields}`; only fields present are written.
    async fn update(&self, input: &Value) -> Result<WriteResult, AppError>;

    async fn delete(&self, id: RecordId) -> Result<Ack, AppError>;
}

/// Operations generated from an `EntityDescriptor`, issuing statements through a shared
/// `Executor`. Construction cannot fail; all checks happen per call.
#[derive(Clone)]
pub struct CrudOperations {
    entity: Arc<EntityDescriptor>,
    executor: Arc<dyn Executor>,
}

impl CrudOperations {
    pub fn new(entity: EntityDescriptor, executor: Arc<dyn Executor>) -> Self {
        Self {
            entity: Arc::new(entity),
            executor,
        }
    }

    pub fn entity(&self) -> &EntityDescriptor {
        &self.entity
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(self.entity.table().to_string())
    }

    async fn fetch_one(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        let rows = self.executor.fetch(q).await?;
        Ok(rows.into_iter().next())
    }
}

/// Pull the numeric `id` out of an update payload.
fn update_id(input: &Value) -> Result<RecordId, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    match input.get(ID) {
        None | Some(Value::Null) => errors.add(ID, "Required"),
        Some(v) => match v.as_i64() {
            Some(id) => return Ok(id),
            None => errors.add(ID, "expected integer"),
        },
    }
    Err(errors)
}

#[async_trait]
impl Operations for CrudOperations {
    fn table(&self) -> &str {
        self.entity.table()
    }

    async fn get_all(&self) -> Result<Vec<Record>, AppError> {
        let q = sql::select_all(&self.entity);
        Ok(self.executor.fetch(&q).await?)
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Record, AppError> {
        let q = sql::select_by_id(&self.entity, id);
        self.fetch_one(&q).await?.ok_or_else(|| self.not_found())
    }

    async fn create(&self, input: &Value) -> Result<WriteResult, AppError> {
        let data = self.entity.schema().validate(input)?;
        let q = sql::insert(&self.entity, &data);
        // INSERT .. RETURNING always yields the row unless the store misbehaves.
        let record = self
            .fetch_one(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        Ok(WriteResult::ok(record))
    }

    async fn update(&self, input: &Value) -> Result<WriteResult, AppError> {
        let id = update_id(input);
        let fields = self.entity.schema().validate_partial(input);
        let (id, data) = match (id, fields) {
            (Ok(id), Ok(data)) => (id, data),
            (Err(mut a), Err(b)) => {
                a.fields.extend(b.fields);
                return Err(a.into());
            }
            (Err(e), _) | (_, Err(e)) => return Err(e.into()),
        };
        let q = sql::update(&self.entity, id, &data)
            .ok_or_else(|| AppError::BadRequest("no fields to update".into()))?;
        let record = self.fetch_one(&q).await?.ok_or_else(|| self.not_found())?;
        Ok(WriteResult::ok(record))
    }

    async fn delete(&self, id: RecordId) -> Result<Ack, AppError> {
        let q = sql::delete(&self.entity, id);
        let affected = self.executor.execute(&q).await?;
        if affected == 0 {
            return Err(self.not_found());
        }
        Ok(Ack { success: true })
    }
}
