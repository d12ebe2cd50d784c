//! One-shot migration runner: executes raw `.sql` files against the store.
//! No bookkeeping table; scripts are expected to be idempotent (`IF NOT EXISTS`).

use crate::error::{AppError, ConfigError};
use sqlx::PgPool;
use std::path::{Path, PathBuf};

/// `.sql` files directly under `dir`, sorted by file name.
pub async fn migration_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run every migration file in order. Stops at the first failure. Returns files applied.
pub async fn apply_migrations(pool: &PgPool, dir: &Path) -> Result<usize, AppError> {
    let files = migration_files(dir).await?;
    tracing::info!(dir = %dir.display(), count = files.len(), "running migrations");
    for path in &files {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        sqlx::raw_sql(&text).execute(pool).await.map_err(|e| {
            tracing::error!(file = %path.display(), error = %e, "migration failed");
            AppError::Db(e)
        })?;
        tracing::info!(file = %path.display(), "migration applied");
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_sql_files_in_name_order() {
        let dir = std::env::temp_dir().join(format!("crudgen-migrations-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for name in ["002.tags.sql", "001.initial.sql", "README.md"] {
            tokio::fs::write(dir.join(name), "SELECT 1;").await.unwrap();
        }
        let files = migration_files(&dir).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["001.initial.sql", "002.tags.sql"]);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_is_a_config_error() {
        let err = migration_files(Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Load(_))));
    }
}
