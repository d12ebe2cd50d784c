//! Read-through cache for list and get-by-id results, keyed by table.
//!
//! Every invalidation bumps a per-table generation. Read-through fills carry the
//! generation observed before the store was queried and are dropped if it moved, so a
//! read that raced a write cannot put the pre-write rows back.

use crate::service::{Record, RecordId};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Storage for cached read results. Implementations must be safe to share across tasks.
#[async_trait]
pub trait ReadCache: Send + Sync {
    /// Current invalidation generation of `table`.
    async fn generation(&self, table: &str) -> Result<u64, CacheError>;

    async fn get_list(&self, table: &str) -> Result<Option<Vec<Record>>, CacheError>;

    /// Store `records` unless `table` was invalidated after `generation` was read.
    /// Returns whether the list was stored.
    async fn fill_list(&self, table: &str, generation: u64, records: &[Record]) -> Result<bool, CacheError>;

    async fn invalidate_list(&self, table: &str) -> Result<(), CacheError>;

    async fn get_record(&self, table: &str, id: RecordId) -> Result<Option<Record>, CacheError>;

    /// Conditional like `fill_list`.
    async fn fill_record(
        &self,
        table: &str,
        generation: u64,
        id: RecordId,
        record: &Record,
    ) -> Result<bool, CacheError>;

    /// Unconditional overwrite with a row the store just returned from a write.
    async fn set_record(&self, table: &str, id: RecordId, record: &Record) -> Result<(), CacheError>;

    async fn invalidate_record(&self, table: &str, id: RecordId) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
struct Entries {
    lists: HashMap<String, Vec<Record>>,
    records: HashMap<(String, RecordId), Record>,
    generations: HashMap<String, u64>,
}

impl Entries {
    fn generation(&self, table: &str) -> u64 {
        self.generations.get(table).copied().unwrap_or(0)
    }

    fn bump(&mut self, table: &str) {
        *self.generations.entry(table.to_string()).or_insert(0) += 1;
    }
}

/// In-process `ReadCache`. No TTL: entries live until invalidated.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<Entries>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadCache for MemoryCache {
    async fn generation(&self, table: &str) -> Result<u64, CacheError> {
        Ok(self.entries.read().await.generation(table))
    }

    async fn get_list(&self, table: &str) -> Result<Option<Vec<Record>>, CacheError> {
        Ok(self.entries.read().await.lists.get(table).cloned())
    }

    async fn fill_list(&self, table: &str, generation: u64, records: &[Record]) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        if entries.generation(table) != generation {
            return Ok(false);
        }
        entries.lists.insert(table.to_string(), records.to_vec());
        Ok(true)
    }

    async fn invalidate_list(&self, table: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.lists.remove(table);
        entries.bump(table);
        Ok(())
    }

    async fn get_record(&self, table: &str, id: RecordId) -> Result<Option<Record>, CacheError> {
        Ok(self.entries.read().await.records.get(&(table.to_string(), id)).cloned())
    }

    async fn fill_record(
        &self,
        table: &str,
        generation: u64,
        id: RecordId,
        record: &Record,
    ) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        if entries.generation(table) != generation {
            return Ok(false);
        }
        entries.records.insert((table.to_string(), id), record.clone());
        Ok(true)
    }

    async fn set_record(&self, table: &str, id: RecordId, record: &Record) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .records
            .insert((table.to_string(), id), record.clone());
        Ok(())
    }

    async fn invalidate_record(&self, table: &str, id: RecordId) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.records.remove(&(table.to_string(), id));
        entries.bump(table);
        Ok(())
    }
}
