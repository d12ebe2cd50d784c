//! Load entity config from a JSON file and resolve it into descriptors.

use crate::config::resolved::{EntityDescriptor, ResolvedEntity};
use crate::config::types::{EntitiesFile, EntityConfig};
use crate::config::validate;
use crate::error::ConfigError;
use crate::service::RuleSchema;
use std::path::Path;
use std::sync::Arc;

/// Build descriptors from entity configs (validates first).
pub fn resolve(entities: &[EntityConfig]) -> Result<Vec<ResolvedEntity>, ConfigError> {
    validate(entities)?;
    entities
        .iter()
        .map(|e| -> Result<ResolvedEntity, ConfigError> {
            let schema = RuleSchema::new(e.fields.clone(), e.validation.clone())?;
            let descriptor = EntityDescriptor::new(e.table.clone(), Arc::new(schema), e.fields.clone())?
                .with_column_types(e.column_types.clone())?;
            Ok(ResolvedEntity {
                name: e.name.clone(),
                descriptor,
            })
        })
        .collect()
}

/// Parse an entities document: either `{"entities": [...]}` or a bare array.
pub fn parse_entities(text: &str) -> Result<Vec<EntityConfig>, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
    let entities = if value.is_array() {
        serde_json::from_value::<Vec<EntityConfig>>(value)
    } else {
        serde_json::from_value::<EntitiesFile>(value).map(|f| f.entities)
    };
    entities.map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and parse the entities file at `path`.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<EntityConfig>, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading entity config");
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_entities(&text)
}
