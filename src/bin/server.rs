//! API server: reads settings and the entity config, builds the registry once, serves the routes.

use crudgen::{
    app, connect, ensure_database_exists, load_from_path, resolve, AppState, Executor, MemoryCache, PgExecutor,
    ReadCache, Registry, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crudgen=info,crudgen_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings).await?;

    let entities = load_from_path(&settings.entities_path).await?;
    let resolved = resolve(&entities)?;
    let executor: Arc<dyn Executor> = Arc::new(PgExecutor::new(pool));
    let cache: Option<Arc<dyn ReadCache>> = if settings.read_cache {
        Some(Arc::new(MemoryCache::new()))
    } else {
        None
    };
    let registry = Registry::build(resolved, executor.clone(), cache);

    let state = AppState {
        registry: Arc::new(registry),
        executor,
    };

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
