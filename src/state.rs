//! Shared application state for all routes. Immutable after startup.

use crate::registry::Registry;
use crate::store::Executor;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Used by the readiness probe.
    pub executor: Arc<dyn Executor>,
}
