//! On-device transcription via whisper.cpp bindings.
//!
//! The engine loads standard ggml models (`ggml-{size}.bin`) from the model
//! directory (`MEETSCRIBE_WHISPER_DIR`, default `./models`). Compute mode is
//! decided by the build, not the caller: a binary compiled with an
//! acceleration backend decodes on GPU, a plain build decodes on CPU.
//!
//! The whole backend sits behind the `whisper` cargo feature; without it,
//! construction reports `BackendUnavailable` and the pipeline degrades to a
//! placeholder transcript.

#[cfg(feature = "whisper")]
use std::path::PathBuf;

use super::{SpeechToText, Transcript, TranscriptionError};

#[cfg(feature = "whisper")]
use super::{Segment, TranscriptStatus};

/// Local whisper backend.
#[derive(Debug)]
pub struct LocalWhisper {
    #[cfg(feature = "whisper")]
    model_path: PathBuf,
    #[cfg(feature = "whisper")]
    model_size: String,
}

impl LocalWhisper {
    /// Build a local backend for the given model size (tiny/base/small/
    /// medium/large-v3). Fails if the model file is absent or the crate was
    /// built without the `whisper` feature.
    pub fn new(model_size: &str) -> Result<Self, TranscriptionError> {
        #[cfg(not(feature = "whisper"))]
        {
            let _ = model_size;
            Err(TranscriptionError::BackendUnavailable(
                "meetscribe was built without the `whisper` feature".into(),
            ))
        }

        #[cfg(feature = "whisper")]
        {
            let model_path = models_dir().join(format!("ggml-{model_size}.bin"));
            if !model_path.exists() {
                return Err(TranscriptionError::BackendUnavailable(format!(
                    "whisper model not found at {}",
                    model_path.display()
                )));
            }
            Ok(Self {
                model_path,
                model_size: model_size.to_string(),
            })
        }
    }
}

#[cfg(feature = "whisper")]
fn models_dir() -> PathBuf {
    std::env::var("MEETSCRIBE_WHISPER_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("models"))
}

#[cfg(not(feature = "whisper"))]
impl SpeechToText for LocalWhisper {
    fn transcribe(&self, _audio: &std::path::Path) -> Result<Transcript, TranscriptionError> {
        Err(TranscriptionError::BackendUnavailable(
            "meetscribe was built without the `whisper` feature".into(),
        ))
    }
}

#[cfg(feature = "whisper")]
impl SpeechToText for LocalWhisper {
    fn transcribe(&self, audio: &std::path::Path) -> Result<Transcript, TranscriptionError> {
        use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

        let bytes = std::fs::read(audio)?;
        let samples = parse_wav_16k_mono(&bytes)?;

        tracing::info!(
            model = %self.model_size,
            samples = samples.len(),
            "Transcribing with local whisper"
        );

        let ctx = WhisperContext::new_with_params(
            &self.model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| TranscriptionError::BackendUnavailable(format!("model load failed: {e}")))?;

        let mut state = ctx
            .create_state()
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("auto"));
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let mut segments = Vec::with_capacity(n_segments as usize);
        let mut full_text = Vec::with_capacity(n_segments as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;
            // Segment times are in centiseconds.
            let start = state.full_get_segment_t0(i).unwrap_or(0) as f64 * 0.01;
            let end = state.full_get_segment_t1(i).unwrap_or(0) as f64 * 0.01;
            full_text.push(text.trim().to_string());
            segments.push(Segment {
                start,
                end,
                text: text.trim().to_string(),
            });
        }

        let language = whisper_rs::get_lang_str(state.full_lang_id()).map(|s| s.to_string());
        let duration_seconds = Some(samples.len() as f64 / 16_000.0);

        tracing::info!(
            segments = segments.len(),
            language = language.as_deref().unwrap_or("unknown"),
            "Local transcription complete"
        );

        Ok(Transcript {
            text: full_text.join(" "),
            language,
            duration_seconds,
            segments,
            status: TranscriptStatus::Complete,
        })
    }
}

/// Decode a 16-bit PCM mono 16 kHz WAV into normalized f32 samples.
///
/// The media adapter produces exactly this format; anything else is a
/// caller error, reported as `InvalidAudio`.
#[cfg_attr(not(feature = "whisper"), allow(dead_code))]
pub(crate) fn parse_wav_16k_mono(bytes: &[u8]) -> Result<Vec<f32>, TranscriptionError> {
    let invalid = |msg: &str| TranscriptionError::InvalidAudio(msg.to_string());

    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(invalid("not a RIFF/WAVE file"));
    }

    let mut pos = 12;
    let mut format: Option<(u16, u16, u32, u16)> = None;
    let mut data: Option<&[u8]> = None;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let body_end = (pos + 8).saturating_add(size).min(bytes.len());
        let body = &bytes[pos + 8..body_end];

        match id {
            b"fmt " if body.len() >= 16 => {
                let audio_format = u16::from_le_bytes(body[0..2].try_into().unwrap());
                let channels = u16::from_le_bytes(body[2..4].try_into().unwrap());
                let sample_rate = u32::from_le_bytes(body[4..8].try_into().unwrap());
                let bits = u16::from_le_bytes(body[14..16].try_into().unwrap());
                format = Some((audio_format, channels, sample_rate, bits));
            }
            b"data" => data = Some(body),
            _ => {}
        }
        // Chunks are word-aligned.
        pos = pos + 8 + size + (size % 2);
    }

    let (audio_format, channels, sample_rate, bits) =
        format.ok_or_else(|| invalid("missing fmt chunk"))?;
    if audio_format != 1 || bits != 16 {
        return Err(invalid("expected 16-bit PCM"));
    }
    if channels != 1 || sample_rate != 16_000 {
        return Err(invalid("expected mono 16 kHz audio"));
    }

    let data = data.ok_or_else(|| invalid("missing data chunk"))?;
    Ok(data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal valid WAV: mono, 16 kHz, 16-bit PCM.
    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&16_000u32.to_le_bytes());
        out.extend_from_slice(&32_000u32.to_le_bytes()); // byte rate
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_valid_mono_16k_wav() {
        let samples = parse_wav_16k_mono(&wav_bytes(&[0, 16_384, -16_384, 32_767])).unwrap();
        assert_eq!(samples.len(), 4);
        assert!((samples[0] - 0.0).abs() < 1e-6);
        assert!((samples[1] - 0.5).abs() < 1e-6);
        assert!((samples[2] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_wav_bytes() {
        assert!(matches!(
            parse_wav_16k_mono(b"definitely not audio"),
            Err(TranscriptionError::InvalidAudio(_))
        ));
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let mut bytes = wav_bytes(&[0; 8]);
        // Patch the sample rate field to 44.1 kHz.
        bytes[24..28].copy_from_slice(&44_100u32.to_le_bytes());
        assert!(matches!(
            parse_wav_16k_mono(&bytes),
            Err(TranscriptionError::InvalidAudio(_))
        ));
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn constructor_reports_unavailable_without_feature() {
        let err = LocalWhisper::new("small").unwrap_err();
        assert!(matches!(err, TranscriptionError::BackendUnavailable(_)));
        assert!(err.to_string().contains("whisper"));
    }
}
