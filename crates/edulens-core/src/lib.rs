//! EduLens Core - Domain types for the study material knowledge pipeline.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
