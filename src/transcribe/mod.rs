pub mod local;
pub mod remote;

pub use local::*;
pub use remote::*;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("transcription backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("remote transcription requires an API credential")]
    MissingCredential,

    #[error("transcription request failed: {0}")]
    RequestFailed(String),

    #[error("transcription endpoint returned status {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("cannot read audio: {0}")]
    InvalidAudio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether the transcript is real output, or a placeholder explaining why
/// there isn't one. The marker survives into the persisted results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Complete,
    Skipped,
    Failed,
}

/// One timestamped span of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Normalized transcription record, shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
    pub duration_seconds: Option<f64>,
    pub segments: Vec<Segment>,
    pub status: TranscriptStatus,
}

impl Transcript {
    /// Placeholder for a run where audio never made it to a backend
    /// (e.g. ffmpeg missing).
    pub fn skipped(reason: &str) -> Self {
        Self {
            text: format!("Audio transcription not available. {reason}"),
            language: None,
            duration_seconds: None,
            segments: vec![],
            status: TranscriptStatus::Skipped,
        }
    }

    /// Placeholder for a backend that ran and failed.
    pub fn failed(error: &str) -> Self {
        Self {
            text: format!("Error: {error}"),
            language: None,
            duration_seconds: None,
            segments: vec![],
            status: TranscriptStatus::Failed,
        }
    }
}

/// Speech-to-text backend contract. Implementations normalize their native
/// result shape into [`Transcript`].
pub trait SpeechToText {
    fn transcribe(&self, audio: &Path) -> Result<Transcript, TranscriptionError>;
}

/// Stand-in backend used when the configured one cannot be constructed
/// (missing model file, crate built without the `whisper` feature, ...).
/// Keeps the pipeline's stage sequence uniform: the transcription stage
/// still runs, fails with a typed error, and degrades.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl SpeechToText for UnavailableBackend {
    fn transcribe(&self, _audio: &Path) -> Result<Transcript, TranscriptionError> {
        Err(TranscriptionError::BackendUnavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_placeholder_carries_marker_and_hint() {
        let t = Transcript::skipped("Install ffmpeg for audio support.");
        assert_eq!(t.status, TranscriptStatus::Skipped);
        assert!(t.text.contains("not available"));
        assert!(t.text.contains("ffmpeg"));
        assert!(t.segments.is_empty());
    }

    #[test]
    fn failed_placeholder_carries_error_text() {
        let t = Transcript::failed("connection refused");
        assert_eq!(t.status, TranscriptStatus::Failed);
        assert!(t.text.starts_with("Error: "));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TranscriptStatus::Skipped).unwrap(),
            "\"skipped\""
        );
        assert_eq!(
            serde_json::to_string(&TranscriptStatus::Complete).unwrap(),
            "\"complete\""
        );
    }

    #[test]
    fn transcript_round_trips_through_json() {
        let t = Transcript {
            text: "Build a login page".into(),
            language: Some("en".into()),
            duration_seconds: Some(12.5),
            segments: vec![Segment {
                start: 0.0,
                end: 2.4,
                text: "Build a login page".into(),
            }],
            status: TranscriptStatus::Complete,
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn unavailable_backend_returns_typed_error() {
        let backend = UnavailableBackend::new("built without the `whisper` feature");
        let err = backend.transcribe(Path::new("/tmp/a.wav")).unwrap_err();
        assert!(matches!(err, TranscriptionError::BackendUnavailable(_)));
        assert!(err.to_string().contains("whisper"));
    }
}
