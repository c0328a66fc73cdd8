//! Hosted transcription over an OpenAI-compatible API.
//!
//! Uploads the extracted WAV as multipart form data to
//! `{base_url}/audio/transcriptions` and normalizes the `verbose_json`
//! response into the common [`Transcript`] record.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::{Segment, SpeechToText, Transcript, TranscriptStatus, TranscriptionError};

/// Default hosted transcription API base.
pub const DEFAULT_REMOTE_BASE: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug)]
pub struct RemoteTranscriber {
    base_url: String,
    model: String,
    credential: String,
    client: reqwest::blocking::Client,
}

impl RemoteTranscriber {
    /// Build a remote backend. A missing credential is a configuration
    /// error surfaced here, before any request is made.
    pub fn new(
        base_url: &str,
        model: &str,
        credential: Option<&str>,
    ) -> Result<Self, TranscriptionError> {
        let credential = match credential {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => return Err(TranscriptionError::MissingCredential),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            credential,
            client,
        })
    }
}

#[derive(Deserialize)]
struct VerboseTranscription {
    text: String,
    language: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

impl SpeechToText for RemoteTranscriber {
    fn transcribe(&self, audio: &Path) -> Result<Transcript, TranscriptionError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        let bytes = std::fs::read(audio)?;

        tracing::info!(model = %self.model, bytes = bytes.len(), "Uploading audio for transcription");

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/wav")
                    .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credential)
            .multipart(form)
            .send()
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranscriptionError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: VerboseTranscription = response
            .json()
            .map_err(|e| TranscriptionError::RequestFailed(format!("bad response: {e}")))?;

        tracing::info!(
            chars = parsed.text.len(),
            language = parsed.language.as_deref().unwrap_or("unknown"),
            "Remote transcription complete"
        );

        Ok(Transcript {
            text: parsed.text,
            language: parsed.language,
            duration_seconds: parsed.duration,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| Segment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
            status: TranscriptStatus::Complete,
        })
    }
}
