//! Database Module
//!
//! PostgreSQL connection pool, migrations and error mapping.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::domain::{RepositoryError, UserId};

/// SQLSTATE `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";

/// Create a PostgreSQL connection pool.
///
/// Every connection runs with `statement_timeout` set to `statement_timeout`,
/// so the server cancels and rolls back a statement that outlives it.
pub async fn create_pool(
    settings: &DatabaseSettings,
    statement_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let url = settings
        .url
        .as_deref()
        .ok_or_else(|| sqlx::Error::Configuration("database.url is not set".into()))?;
    let set_timeout = statement_timeout_sql(statement_timeout);

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .after_connect(move |conn, _meta| {
            let set_timeout = set_timeout.clone();
            Box::pin(async move {
                sqlx::query(&set_timeout).execute(conn).await?;
                Ok(())
            })
        })
        .connect(url)
        .await
}

fn statement_timeout_sql(timeout: Duration) -> String {
    format!("SET statement_timeout = {}", timeout.as_millis().max(1))
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Round-trip a trivial query; used by the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::DuplicateKey(db_err.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(QUERY_CANCELED) => {
                RepositoryError::Timeout
            }
            sqlx::Error::PoolTimedOut => RepositoryError::Timeout,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                RepositoryError::Corrupt(e.to_string())
            }
            _ => RepositoryError::Unavailable(e.to_string()),
        }
    }
}

/// User IDs are unsigned in the domain and BIGINT in PostgreSQL.
pub(crate) fn user_id_to_db(user_id: UserId) -> Result<i64, RepositoryError> {
    i64::try_from(user_id)
        .map_err(|_| RepositoryError::Corrupt(format!("user id {user_id} exceeds BIGINT range")))
}

pub(crate) fn user_id_from_db(value: i64) -> Result<UserId, RepositoryError> {
    UserId::try_from(value)
        .map_err(|_| RepositoryError::Corrupt(format!("negative user id {value} in storage")))
}
