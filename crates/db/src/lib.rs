//! Job Store: the durable record of every job.
//!
//! - [`store::JobStore`] -- the storage seam, implemented by
//!   [`repositories::PgJobStore`] (Postgres) and [`memory::MemoryJobStore`].
//! - [`mutation::apply_mutation`] -- the single load-mutate-persist choke
//!   point every status change goes through.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod mutation;
pub mod repositories;
pub mod store;

pub use memory::MemoryJobStore;
pub use mutation::{apply_mutation, revert, MutationError, Mutated, Outcome};
pub use repositories::PgJobStore;
pub use store::{JobStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
