//! Domain model structs and DTOs.
//!
//! - A `FromRow` row struct matching the database columns
//! - The domain entity built from it, with its mutation methods
//! - A create DTO for inserts

pub mod job;
