pub mod auth;
pub mod worker_key;
