//! crudgen: declarative CRUD operations over PostgreSQL.
//!
//! Each entity is described once (table, validation rules, ordered writable fields); the
//! factory in [`service`] turns that description into list / get / create / update /
//! delete operations with parameterized SQL, and [`registry::Registry`] exposes them by name.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use cache::{MemoryCache, ReadCache};
pub use config::{load_from_path, resolve, EntityConfig, EntityDescriptor, ResolvedEntity, Settings};
pub use error::{AppError, ConfigError, ValidationErrors};
pub use migration::apply_migrations;
pub use registry::Registry;
pub use routes::{app, common_routes, entity_routes};
pub use service::{Ack, CachedOperations, CrudOperations, Operations, Record, RecordId, RuleSchema, Schema, WriteResult};
pub use state::AppState;
pub use store::{connect, ensure_database_exists, Executor, PgExecutor};
