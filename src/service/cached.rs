//! Opt-in decorator: reads go through a `ReadCache`, successful writes refresh it.
//!
//! Refresh is best effort. A cache failure after a write is logged and the write's own
//! result is returned unchanged.

use crate::cache::{CacheError, ReadCache};
use crate::error::AppError;
use crate::service::{Ack, Operations, Record, RecordId, WriteResult};
use crate::sql::ID;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct CachedOperations<O> {
    inner: O,
    cache: Arc<dyn ReadCache>,
}

impl<O: Operations> CachedOperations<O> {
    pub fn new(inner: O, cache: Arc<dyn ReadCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn log_refresh(&self, step: &'static str, result: Result<(), CacheError>) {
        if let Err(e) = result {
            tracing::warn!(table = %self.inner.table(), step, error = %e, "cache refresh failed");
        }
    }

    fn log_fill(&self, step: &'static str, result: Result<bool, CacheError>) {
        match result {
            Ok(true) => {}
            Ok(false) => tracing::debug!(table = %self.inner.table(), step, "write raced the read; fill skipped"),
            Err(e) => tracing::warn!(table = %self.inner.table(), step, error = %e, "cache fill failed"),
        }
    }

    /// Generation to fence the coming fill with; `None` when the cache cannot say.
    async fn fence(&self) -> Option<u64> {
        match self.cache.generation(self.inner.table()).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(table = %self.inner.table(), error = %e, "cache read failed");
                None
            }
        }
    }
}

#[async_trait]
impl<O: Operations> Operations for CachedOperations<O> {
    fn table(&self) -> &str {
        self.inner.table()
    }

    async fn get_all(&self) -> Result<Vec<Record>, AppError> {
        let table = self.inner.table();
        match self.cache.get_list(table).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(table = %table, error = %e, "cache read failed"),
        }
        let fence = self.fence().await;
        let records = self.inner.get_all().await?;
        if let Some(generation) = fence {
            self.log_fill("fill_list", self.cache.fill_list(table, generation, &records).await);
        }
        Ok(records)
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Record, AppError> {
        let table = self.inner.table();
        match self.cache.get_record(table, id).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(table = %table, id, error = %e, "cache read failed"),
        }
        let fence = self.fence().await;
        let record = self.inner.get_by_id(id).await?;
        if let Some(generation) = fence {
            self.log_fill("fill_record", self.cache.fill_record(table, generation, id, &record).await);
        }
        Ok(record)
    }

    async fn create(&self, input: &Value) -> Result<WriteResult, AppError> {
        let result = self.inner.create(input).await?;
        self.log_refresh("invalidate_list", self.cache.invalidate_list(self.inner.table()).await);
        Ok(result)
    }

    async fn update(&self, input: &Value) -> Result<WriteResult, AppError> {
        let result = self.inner.update(input).await?;
        let table = self.inner.table();
        self.log_refresh("invalidate_list", self.cache.invalidate_list(table).await);
        let id = result.data.get(ID).and_then(Value::as_i64).or_else(|| input.get(ID).and_then(Value::as_i64));
        if let Some(id) = id {
            self.log_refresh("set_record", self.cache.set_record(table, id, &result.data).await);
        }
        Ok(result)
    }

    async fn delete(&self, id: RecordId) -> Result<Ack, AppError> {
        let ack = self.inner.delete(id).await?;
        let table = self.inner.table();
        self.log_refresh("invalidate_list", self.cache.invalidate_list(table).await);
        self.log_refresh("invalidate_record", self.cache.invalidate_record(table, id).await);
        Ok(ack)
    }
}
