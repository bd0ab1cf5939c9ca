//! Database CRUD operations.

pub mod artifacts;
pub mod chunks;
pub mod questions;
pub mod sessions;
pub mod stats;
pub mod topics;
pub mod vectors;
