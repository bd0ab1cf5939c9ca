//! Recorded lectures: audio is pulled out with FFmpeg and transcribed with Whisper.

use super::Extraction;
use crate::error::ExtractionError;
use edulens_process::{extract_audio, get_media_info, transcribe_audio};
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;
use tracing::{debug, info};

/// Extractor for audio and video uploads.
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    /// Whisper model to use (tiny, base, small, medium, large)
    whisper_model: String,
}

impl MediaExtractor {
    pub fn new(whisper_model: impl Into<String>) -> Self {
        Self {
            whisper_model: whisper_model.into(),
        }
    }

    pub fn extract(&self, path: &Path) -> Result<Extraction, ExtractionError> {
        info!("Transcribing recording: {:?}", path);

        let media = get_media_info(path)?;
        if !media.has_audio() {
            return Err(ExtractionError::Unsupported(
                "recording has no audio stream".to_string(),
            ));
        }
        debug!(
            "Media info: {:.1}s, video={:?}, audio={:?}",
            media.duration, media.video_codec, media.audio_codec
        );

        let work_dir = tempdir().map_err(|source| ExtractionError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let audio_path = extract_audio(path, work_dir.path())?;
        let transcript = transcribe_audio(&audio_path, &self.whisper_model, work_dir.path())?;

        let mut extraction = Extraction::new(transcript.text())
            .with_metadata("format", json!(media.format.as_deref().unwrap_or("media")))
            .with_metadata("duration", json!(media.duration))
            .with_metadata("audio_codec", json!(media.audio_codec))
            .with_metadata("segment_count", json!(transcript.len()))
            .with_metadata("spoken_seconds", json!(transcript.spoken_until()))
            .with_metadata("whisper_model", json!(self.whisper_model));

        if media.has_video() {
            extraction = extraction
                .with_metadata("width", json!(media.width))
                .with_metadata("height", json!(media.height))
                .with_metadata("video_codec", json!(media.video_codec))
                .with_metadata("fps", json!(media.fps));
        }

        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recording_is_a_media_error() {
        let extractor = MediaExtractor::new("base");
        let err = extractor
            .extract(Path::new("/nonexistent/lecture.mp4"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Media(_)));
    }
}
