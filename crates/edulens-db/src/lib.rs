//! EduLens DB - SQLite storage for artifacts and their derived study content.

mod codec;
mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::vectors::{cosine_similarity, SimilarityResult};
