//! Layered configuration resolution.
//!
//! One `EffectiveConfig` is resolved per analysis run and never mutated
//! afterward. Precedence per field, highest first:
//!
//!   explicit override > named profile > environment > built-in default
//!
//! An unknown profile name is logged and skipped — resolution continues with
//! the lower-precedence sources instead of aborting.

use std::path::PathBuf;

use crate::profiles;

/// Default inference endpoint (Ollama-compatible API).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_TEXT_MODEL: &str = "phi3:mini";
pub const DEFAULT_VISION_MODEL: &str = "llava:7b";
pub const DEFAULT_WHISPER_MODEL: &str = "small";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown profile: {name}. Available profiles: {available}")]
    UnknownProfile { name: String, available: String },
}

/// Which speech-to-text backend the run uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionBackend {
    /// On-device whisper; the model size lives in `EffectiveConfig::whisper_model`.
    Local,
    /// Hosted transcription API. The credential is validated at backend
    /// construction, before any request is made.
    Remote {
        model: String,
        credential: Option<String>,
    },
}

/// Explicit per-field overrides, e.g. from CLI flags. `None` defers to the
/// next precedence layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint_url: Option<String>,
    pub text_model: Option<String>,
    pub vision_model: Option<String>,
    pub whisper_model: Option<String>,
    pub vision_on_cpu: Option<bool>,
    pub output_dir: Option<PathBuf>,
    /// Selecting a remote transcription model switches the backend to Remote.
    pub remote_transcription_model: Option<String>,
    pub api_key: Option<String>,
}

/// Environment snapshot consumed by the resolver.
///
/// Captured once (`from_env`) and passed in explicitly so resolution stays a
/// pure function of its inputs and tests can inject arbitrary environments.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub endpoint_url: Option<String>,
    pub text_model: Option<String>,
    pub vision_model: Option<String>,
    pub whisper_model: Option<String>,
    pub api_key: Option<String>,
    pub output_dir: Option<String>,
}

impl Environment {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            endpoint_url: var("MEETSCRIBE_ENDPOINT"),
            text_model: var("MEETSCRIBE_TEXT_MODEL"),
            vision_model: var("MEETSCRIBE_VISION_MODEL"),
            whisper_model: var("MEETSCRIBE_WHISPER_MODEL"),
            api_key: var("MEETSCRIBE_API_KEY"),
            output_dir: var("MEETSCRIBE_OUTPUT_DIR"),
        }
    }
}

/// The resolved configuration for one run. Immutable once built; re-running
/// with different inputs resolves a fresh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub endpoint_url: String,
    pub text_model: String,
    pub vision_model: String,
    /// Local whisper model size.
    pub whisper_model: String,
    pub vision_on_cpu: bool,
    pub output_dir: PathBuf,
    pub transcription: TranscriptionBackend,
}

/// Merge overrides, an optional named profile, the environment, and the
/// built-in defaults into one `EffectiveConfig`.
///
/// An unknown profile name logs a warning and resolution continues without
/// a profile layer — it never aborts the run.
pub fn resolve(
    overrides: &ConfigOverrides,
    profile_name: Option<&str>,
    env: &Environment,
) -> EffectiveConfig {
    let profile = match profile_name {
        Some(name) => match profiles::get(name) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(profile = name, error = %e, "Ignoring unknown profile");
                None
            }
        },
        None => None,
    };

    let text_model = overrides
        .text_model
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.text_model.to_string()))
        .or_else(|| env.text_model.clone())
        .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string());

    let vision_model = overrides
        .vision_model
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.vision_model.to_string()))
        .or_else(|| env.vision_model.clone())
        .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());

    let whisper_model = overrides
        .whisper_model
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.whisper_model.to_string()))
        .or_else(|| env.whisper_model.clone())
        .unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string());

    // Profiles don't pin the endpoint; it is a deployment property, not a
    // hardware property.
    let endpoint_url = overrides
        .endpoint_url
        .clone()
        .or_else(|| env.endpoint_url.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let vision_on_cpu = overrides
        .vision_on_cpu
        .or_else(|| profile.as_ref().map(|p| p.vision_on_cpu))
        .unwrap_or(false);

    let output_dir = overrides
        .output_dir
        .clone()
        .or_else(|| env.output_dir.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let transcription = match &overrides.remote_transcription_model {
        Some(model) => TranscriptionBackend::Remote {
            model: model.clone(),
            credential: overrides.api_key.clone().or_else(|| env.api_key.clone()),
        },
        None => TranscriptionBackend::Local,
    };

    EffectiveConfig {
        endpoint_url,
        text_model,
        vision_model,
        whisper_model,
        vision_on_cpu,
        output_dir,
        transcription,
    }
}
