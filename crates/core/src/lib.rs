//! Domain vocabulary shared by every lessoncast crate.
//!
//! This crate has zero internal dependencies so the store, queue and API
//! layers (and any future worker tooling) can all depend on it.

pub mod api_keys;
pub mod channels;
pub mod error;
pub mod job_events;
pub mod state_machine;
pub mod status;
pub mod tasks;
pub mod types;
