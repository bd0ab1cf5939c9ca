//! The command-line tools recordings depend on.

use crate::error::{ProcessError, ProcessResult};
use std::fmt;
use std::process::{Command, Output};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTool {
    Ffmpeg,
    Ffprobe,
    Whisper,
}

impl ExternalTool {
    pub const ALL: [ExternalTool; 3] = [Self::Ffmpeg, Self::Ffprobe, Self::Whisper];

    pub fn binary(self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Ffprobe => "ffprobe",
            Self::Whisper => "whisper",
        }
    }

    pub fn is_installed(self) -> bool {
        which::which(self.binary()).is_ok()
    }

    /// A command for this tool, or `MissingTool` when it is not on PATH.
    pub(crate) fn command(self) -> ProcessResult<Command> {
        let path = which::which(self.binary()).map_err(|_| ProcessError::MissingTool(self))?;
        Ok(Command::new(path))
    }

    /// Run a prepared command and require a zero exit status.
    pub(crate) fn run(self, mut command: Command) -> ProcessResult<Output> {
        debug!(tool = self.binary(), "Running {:?}", command);
        let output = command.output()?;
        if !output.status.success() {
            return Err(ProcessError::ToolFailed {
                tool: self,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl fmt::Display for ExternalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binaries_are_distinct() {
        let names: Vec<_> = ExternalTool::ALL.iter().map(|t| t.binary()).collect();
        assert_eq!(names, vec!["ffmpeg", "ffprobe", "whisper"]);
        assert_eq!(ExternalTool::Whisper.to_string(), "whisper");
    }

    #[test]
    fn test_failure_carries_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'bad input' >&2; exit 3"]);
        match ExternalTool::Ffmpeg.run(command) {
            Err(ProcessError::ToolFailed { tool, stderr }) => {
                assert_eq!(tool, ExternalTool::Ffmpeg);
                assert_eq!(stderr, "bad input");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
