//! Shared helpers for integration tests.

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pushkind_deals::db::{DbPool, establish_connection_pool};
use pushkind_deals::models::config::DatabaseSettings;
use tempfile::TempDir;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Migrated SQLite database living in a temporary directory.
///
/// The directory, and with it the database file, is removed on drop.
pub struct TestDb {
    pool: DbPool,
    _dir: TempDir,
}

impl TestDb {
    pub fn new(file_name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let settings = DatabaseSettings {
            url: dir.path().join(file_name).to_string_lossy().into_owned(),
            pool_size: 2,
            enable_wal: true,
            busy_timeout_secs: 5,
        };
        let pool = establish_connection_pool(&settings).expect("create pool");
        let mut conn = pool.get().expect("get connection");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("run migrations");

        Self { pool, _dir: dir }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}
