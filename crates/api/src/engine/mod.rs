//! Job engine: lifecycle operations and worker progress ingest.

pub mod lifecycle;
pub mod progress;
