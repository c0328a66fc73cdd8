//! Audio track extraction.
//!
//! Transcription backends expect mono 16 kHz PCM, so the track is
//! re-encoded on the way out regardless of the source format.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::MediaError;

/// Extract the audio track of `video` into `out_dir` as a mono 16 kHz WAV.
///
/// A missing ffmpeg binary or a failed transcode returns a typed error; the
/// caller decides whether the run continues without a transcript.
pub fn extract_audio(video: &Path, out_dir: &Path) -> Result<PathBuf, MediaError> {
    std::fs::create_dir_all(out_dir)?;

    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let out_path = out_dir.join(format!("{stem}.wav"));

    tracing::info!(video = %video.display(), "Extracting audio track");

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(video)
        .args([
            "-vn",
            "-acodec",
            "pcm_s16le",
            // 16 kHz mono is what speech models are trained on.
            "-ar",
            "16000",
            "-ac",
            "1",
        ])
        .arg(&out_path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediaError::ToolUnavailable { tool: "ffmpeg", source: e }
            } else {
                MediaError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(MediaError::CommandFailed {
            tool: "ffmpeg",
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    tracing::info!(audio = %out_path.display(), "Audio extracted");
    Ok(out_path)
}
