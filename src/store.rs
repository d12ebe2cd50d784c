//! Store boundary: the parameterized-query executor, its PostgreSQL implementation,
//! and pool/database bootstrap.

use crate::config::Settings;
use crate::error::{AppError, ConfigError};
use crate::service::Record;
use crate::sql::{PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Runs parameterized statements. Values arrive only through `QueryBuf::params`.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement that yields rows (SELECT, or a write with RETURNING).
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Record>, sqlx::Error>;

    /// Run a statement and return the affected-row count.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, sqlx::Error>;

    /// Cheap liveness check used by the readiness probe.
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// `Executor` over a shared `PgPool`. The pool owns connection limits and backpressure.
#[derive(Clone, Debug)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all<'q>(
    sql: &'q str,
    params: &[Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

#[async_trait]
impl Executor for PgExecutor {
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Record>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(&q.sql, &q.params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let result = bind_all(&q.sql, &q.params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<Record, sqlx::Error> {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name)?);
    }
    Ok(map)
}

/// Decode one cell. Types without a dedicated decoder are read as text (enums, citext and
/// similar send their text form); anything else is a decode error, never a silent null.
fn cell_to_value(row: &PgRow, name: &str) -> Result<Value, sqlx::Error> {
    use sqlx::{Row, TypeInfo, ValueRef};
    let raw = row.try_get_raw(name)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    if let Ok(n) = row.try_get::<i16, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i32, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i64, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<f32, _>(name) {
        return Ok(float_value(n as f64));
    }
    if let Ok(n) = row.try_get::<f64, _>(name) {
        return Ok(float_value(n));
    }
    // Text keeps NUMERIC scale and precision ("12.50").
    if let Ok(d) = row.try_get::<rust_decimal::Decimal, _>(name) {
        return Ok(Value::String(d.to_string()));
    }
    if let Ok(b) = row.try_get::<bool, _>(name) {
        return Ok(Value::Bool(b));
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(name) {
        return Ok(Value::String(u.to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
        return Ok(Value::String(d.to_rfc3339()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDateTime, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDate, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(s) = row.try_get::<String, _>(name) {
        return Ok(Value::String(s));
    }
    if let Ok(j) = row.try_get::<Value, _>(name) {
        return Ok(j);
    }
    // NUMERIC outside Decimal's range (or NaN) has a binary form that is not text.
    let text: Result<String, sqlx::error::BoxDynError> = match type_name.as_str() {
        "NUMERIC" => Err("out of range".into()),
        _ => row.try_get_raw(name)?.as_str().map(str::to_string),
    };
    match text {
        Ok(s) => Ok(Value::String(s)),
        Err(e) => Err(sqlx::Error::ColumnDecode {
            index: name.to_string(),
            source: format!("unsupported column type {}: {}", type_name, e).into(),
        }),
    }
}

/// NaN and infinities have no JSON form; they come back as strings.
fn float_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

/// Open the shared pool with the configured connection cap and idle eviction.
pub async fn connect(settings: &Settings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .idle_timeout(settings.idle_timeout)
        .connect(&settings.database_url)
        .await?;
    tracing::info!(
        max_connections = settings.max_connections,
        idle_timeout_secs = settings.idle_timeout.as_secs(),
        "connected to database"
    );
    Ok(pool)
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Load(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| ConfigError::Load("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_admin_url_and_database_name() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/crudgen?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "crudgen");
    }

    #[test]
    fn url_without_path_is_a_config_error() {
        assert!(matches!(parse_db_name_from_url("nonsense"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn malformed_url_is_reported_as_config_not_request_error() {
        let err = ensure_database_exists("not a url/crudgen").await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Load(_))), "{err:?}");
    }

    #[test]
    fn non_finite_floats_do_not_become_null() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), Value::String("NaN".into()));
    }

    #[test]
    fn quotes_database_identifiers() {
        assert_eq!(quote_ident("my\"db"), "\"my\"\"db\"");
    }
}
