//! Speech to text with the Whisper CLI (`pip install openai-whisper`).

use crate::error::{ProcessError, ProcessResult};
use crate::tool::ExternalTool;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One timed span of speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Seconds from the start of the recording.
    pub start: f64,
    pub end: f64,
}

/// Whisper's result for one recording, blank segments removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Segment texts joined by single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// End of the last spoken segment, in seconds.
    pub fn spoken_until(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn from_whisper_json(json: &str) -> ProcessResult<Self> {
        #[derive(Deserialize)]
        struct WhisperFile {
            #[serde(default)]
            segments: Vec<TranscriptSegment>,
        }

        let file: WhisperFile =
            serde_json::from_str(json).map_err(|e| ProcessError::BadOutput {
                tool: ExternalTool::Whisper,
                reason: e.to_string(),
            })?;

        let segments = file
            .segments
            .into_iter()
            .filter_map(|mut s| {
                let trimmed = s.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                s.text = trimmed.to_string();
                Some(s)
            })
            .collect();
        Ok(Self { segments })
    }
}

/// Transcribe `audio_path` with the given Whisper model.
///
/// Whisper writes `<stem>.json` into `output_dir`; that file is read back.
pub fn transcribe_audio(audio_path: &Path, model: &str, output_dir: &Path) -> ProcessResult<Transcript> {
    if !audio_path.exists() {
        return Err(ProcessError::MissingInput(audio_path.to_path_buf()));
    }

    info!("Transcribing {:?} with model '{}'", audio_path, model);
    let mut command = ExternalTool::Whisper.command()?;
    command
        .arg(audio_path)
        .args(["--model", model, "--output_format", "json"])
        .arg("--output_dir")
        .arg(output_dir);
    ExternalTool::Whisper.run(command)?;

    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let json_path = output_dir.join(format!("{}.json", stem));
    if !json_path.exists() {
        return Err(ProcessError::BadOutput {
            tool: ExternalTool::Whisper,
            reason: format!("{} was not written", json_path.display()),
        });
    }

    let transcript = Transcript::from_whisper_json(&std::fs::read_to_string(&json_path)?)?;
    info!("Transcribed {} segments", transcript.len());
    Ok(transcript)
}
