//! Postgres-backed implementations of the storage seams.

pub mod job_repo;

pub use job_repo::PgJobStore;
