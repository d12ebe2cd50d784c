//! Entity name to operation bundle. Built once at startup, read-only afterwards.

use crate::cache::ReadCache;
use crate::config::ResolvedEntity;
use crate::service::{CachedOperations, CrudOperations, Operations};
use crate::store::Executor;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Arc<dyn Operations>>,
    names: Vec<String>,
}

impl Registry {
    /// Run the factory once per entity. With `cache`, each bundle is wrapped in the
    /// write-triggers-refresh decorator.
    pub fn build(
        entities: Vec<ResolvedEntity>,
        executor: Arc<dyn Executor>,
        cache: Option<Arc<dyn ReadCache>>,
    ) -> Self {
        let mut registry = Registry::default();
        for entity in entities {
            let crud = CrudOperations::new(entity.descriptor, executor.clone());
            let ops: Arc<dyn Operations> = match &cache {
                Some(cache) => Arc::new(CachedOperations::new(crud, cache.clone())),
                None => Arc::new(crud),
            };
            tracing::info!(entity = %entity.name, table = %ops.table(), cached = cache.is_some(), "registered entity");
            registry.insert(entity.name, ops);
        }
        registry
    }

    /// Register a bundle directly. A later insert under the same name replaces the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, ops: Arc<dyn Operations>) {
        let name = name.into();
        if self.entries.insert(name.clone(), ops).is_none() {
            self.names.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operations>> {
        self.entries.get(name)
    }

    /// Entity names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
