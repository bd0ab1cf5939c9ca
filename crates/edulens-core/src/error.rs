//! Violations of the domain rules.

use crate::types::ArtifactStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A status change the artifact lifecycle does not allow.
    #[error("Artifact cannot move from {from} to {to}")]
    InvalidTransition {
        from: ArtifactStatus,
        to: ArtifactStatus,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session progress JSON with a field of the wrong type.
    #[error("Malformed session progress: {0}")]
    Progress(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
