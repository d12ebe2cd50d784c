//! Applies the raw SQL files in `MIGRATIONS_DIR` once and exits.

use crudgen::{apply_migrations, connect, ensure_database_exists, Settings};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crudgen=info,crudgen_migrate=info")),
        )
        .init();

    match run().await {
        Ok(count) => {
            tracing::info!(count, "all migrations completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "migration failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<usize, crudgen::AppError> {
    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings).await?;
    let applied = apply_migrations(&pool, &settings.migrations_dir).await;
    pool.close().await;
    applied
}
