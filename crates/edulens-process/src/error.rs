//! Failures while turning recordings into transcripts.

use crate::tool::ExternalTool;
use std::path::PathBuf;
use thiserror::Error;

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recording not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{0} is not installed or not on PATH")]
    MissingTool(ExternalTool),

    /// The tool ran and exited non-zero; `stderr` is its trimmed diagnostic output.
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: ExternalTool, stderr: String },

    /// The tool succeeded but wrote something we could not read.
    #[error("Could not read {tool} output: {reason}")]
    BadOutput { tool: ExternalTool, reason: String },
}
