//! Recorded lectures into text: FFmpeg inspects media and extracts audio, Whisper transcribes it.
//!
//! Both are external command-line tools that must be on PATH.

mod error;
mod ffmpeg;
mod tool;
mod transcribe;

pub use error::{ProcessError, ProcessResult};
pub use ffmpeg::{extract_audio, get_media_info, MediaInfo};
pub use tool::ExternalTool;
pub use transcribe::{transcribe_audio, Transcript, TranscriptSegment};

/// Each external tool paired with whether it is installed.
pub fn check_dependencies() -> Vec<(ExternalTool, bool)> {
    ExternalTool::ALL
        .iter()
        .map(|tool| (*tool, tool.is_installed()))
        .collect()
}

pub fn all_tools_available() -> bool {
    ExternalTool::ALL.iter().all(|tool| tool.is_installed())
}
