//! Database connection helpers.
//!
//! A small wrapper around the Diesel connection pool for the SQLite file that
//! backs the deal logs.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel::sqlite::SqliteConnection;
use log::error;

use crate::models::config::DatabaseSettings;
use crate::repository::errors::RepositoryResult;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
/// Pragmas applied each time a connection is acquired from the pool.
struct SqlitePragmas {
    enable_wal: bool,
    busy_timeout: Option<Duration>,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        (|| {
            if self.enable_wal {
                conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
            }
            if let Some(d) = self.busy_timeout {
                conn.batch_execute(&format!("PRAGMA busy_timeout = {};", d.as_millis()))?;
            }
            Ok(())
        })()
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a Diesel connection pool for the configured SQLite database.
pub fn establish_connection_pool(settings: &DatabaseSettings) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(&settings.url);
    Pool::builder()
        .max_size(settings.pool_size)
        .connection_customizer(Box::new(SqlitePragmas {
            enable_wal: settings.enable_wal,
            busy_timeout: (settings.busy_timeout_secs > 0)
                .then(|| Duration::from_secs(settings.busy_timeout_secs)),
        }))
        .build(manager)
}

/// Retrieve a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, PoolError> {
    pool.get().inspect_err(|e| error!("Failed to get connection from pool: {e}"))
}

const CREATE_KV_ENTRIES: &str =
    include_str!("../migrations/2025-01-01-000000_create_kv_entries/up.sql");

/// Creates the `kv_entries` table when it does not exist yet.
pub fn ensure_schema(pool: &DbPool) -> RepositoryResult<()> {
    let mut conn = get_connection(pool)?;
    conn.batch_execute(CREATE_KV_ENTRIES)?;
    Ok(())
}
