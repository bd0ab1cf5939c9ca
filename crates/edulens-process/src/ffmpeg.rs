//! FFmpeg integration for lecture recordings.

use crate::error::{ProcessError, ProcessResult};
use crate::tool::ExternalTool;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Information about an audio or video file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds.
    pub duration: f64,
    /// Width in pixels, 0 for audio-only files.
    pub width: u32,
    /// Height in pixels, 0 for audio-only files.
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub fps: Option<f64>,
    /// Bitrate in bits per second.
    pub bitrate: Option<u64>,
    pub format: Option<String>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Inspect an audio or video file with ffprobe.
pub fn get_media_info(path: &Path) -> ProcessResult<MediaInfo> {
    if !path.exists() {
        return Err(ProcessError::MissingInput(path.to_path_buf()));
    }

    let mut command = ExternalTool::Ffprobe.command()?;
    command
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path);
    let output = ExternalTool::Ffprobe.run(command)?;

    parse_media_report(&String::from_utf8_lossy(&output.stdout))
}

fn parse_media_report(json: &str) -> ProcessResult<MediaInfo> {
    let report: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProcessError::BadOutput {
            tool: ExternalTool::Ffprobe,
            reason: e.to_string(),
        })?;

    let video_stream = report.streams.iter().find(|s| s.codec_type == "video");
    let audio_stream = report.streams.iter().find(|s| s.codec_type == "audio");

    let duration = report
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let (width, height) = video_stream
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0));

    Ok(MediaInfo {
        duration,
        width,
        height,
        video_codec: video_stream.and_then(|s| s.codec_name.clone()),
        audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
        fps: video_stream
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
        bitrate: report.format.bit_rate.as_ref().and_then(|b| b.parse().ok()),
        format: report.format.format_name,
    })
}

/// Parse ffprobe's `num/den` frame rate notation.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

/// Extract the audio track as 16 kHz mono WAV, the input Whisper expects.
///
/// Returns the path to the extracted audio file.
pub fn extract_audio(media_path: &Path, output_dir: &Path) -> ProcessResult<PathBuf> {
    if !media_path.exists() {
        return Err(ProcessError::MissingInput(media_path.to_path_buf()));
    }

    let stem = media_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let audio_path = output_dir.join(format!("{}.wav", stem));
    info!("Extracting audio from {:?} to {:?}", media_path, audio_path);

    let mut command = ExternalTool::Ffmpeg.command()?;
    command
        .arg("-i")
        .arg(media_path)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y"])
        .arg(&audio_path);
    ExternalTool::Ffmpeg.run(command)?;

    debug!("Audio extracted");
    Ok(audio_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_report_video() {
        let json = r#"{
            "format": {"duration": "125.5", "bit_rate": "800000", "format_name": "mov,mp4"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720, "r_frame_rate": "30000/1001"},
                {"codec_type": "audio", "codec_name": "aac"}
            ]
        }"#;
        let info = parse_media_report(json).unwrap();
        assert_eq!(info.duration, 125.5);
        assert_eq!((info.width, info.height), (1280, 720));
        assert!(info.has_video());
        assert!(info.has_audio());
        assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(info.bitrate, Some(800_000));
        assert_eq!(info.format.as_deref(), Some("mov,mp4"));
    }

    #[test]
    fn test_parse_media_report_audio_only() {
        let json = r#"{"format": {"duration": "60"}, "streams": [{"codec_type": "audio", "codec_name": "mp3"}]}"#;
        let info = parse_media_report(json).unwrap();
        assert!(!info.has_video());
        assert_eq!(info.audio_codec.as_deref(), Some("mp3"));
        assert_eq!(info.width, 0);
    }

    #[test]
    fn test_parse_media_report_garbage() {
        assert!(matches!(
            parse_media_report("not json"),
            Err(ProcessError::BadOutput {
                tool: ExternalTool::Ffprobe,
                ..
            })
        ));
    }

    #[test]
    fn test_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("1/0"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = extract_audio(Path::new("/nonexistent/lecture.mp4"), Path::new("/tmp"));
        assert!(matches!(err, Err(ProcessError::MissingInput(_))));
    }
}
