mod common;
mod entity;

pub use common::common_routes;
pub use entity::{entity_routes, BODY_LIMIT_BYTES};

use crate::state::AppState;
use axum::Router;

/// Full application router: common routes at the root, entity routes under `/api`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api", entity_routes(state))
}
