//! Analysis contracts and payload shapes.

use std::path::PathBuf;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::AnalysisError;

/// Text generation client abstraction (allows mocking).
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, AnalysisError>;
}

/// Vision client abstraction: describe one image (allows mocking).
pub trait VisionClient: Send + Sync {
    fn describe_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, AnalysisError>;
}

/// Analysis of a single frame. A failed caption call leaves its error
/// placeholder in `analysis`; entries are never dropped or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub index: u64,
    pub frame: PathBuf,
    pub analysis: String,
}

impl FrameAnalysis {
    /// Whether this slot holds the error placeholder instead of a caption.
    pub fn is_error(&self) -> bool {
        self.analysis.starts_with("Error: ")
    }
}

/// The synthesized requirements, in exactly one of three shapes.
///
/// The structured schema is advisory, not enforced: when the model's output
/// parses as a JSON object we pass the mapping through untouched; when it
/// doesn't parse we keep the raw text; when generation itself failed we keep
/// the error. Renderers match on the tag instead of shape-sniffing.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementsPayload {
    Structured(Map<String, Value>),
    RawText(String),
    Failed { error: String },
}

impl RequirementsPayload {
    /// Look up a structured section by key, accepting both the snake_case
    /// and the prompt's UPPER-CASE spelling.
    pub fn section(&self, snake_key: &str, upper_key: &str) -> Option<&Value> {
        match self {
            Self::Structured(map) => map.get(snake_key).or_else(|| map.get(upper_key)),
            _ => None,
        }
    }
}

// Wire shapes:
//   Structured(map)    → the mapping itself
//   RawText(text)      → {"raw_analysis": text}
//   Failed {error}     → {"error": error, "status": "failed"}
impl Serialize for RequirementsPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Structured(map) => map.serialize(serializer),
            Self::RawText(text) => {
                let mut wrapper = Map::new();
                wrapper.insert("raw_analysis".into(), Value::String(text.clone()));
                wrapper.serialize(serializer)
            }
            Self::Failed { error } => {
                let mut wrapper = Map::new();
                wrapper.insert("error".into(), Value::String(error.clone()));
                wrapper.insert("status".into(), Value::String("failed".into()));
                wrapper.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for RequirementsPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(D::Error::custom(format!(
                    "requirements payload must be an object, got {other}"
                )))
            }
        };

        if map.len() == 1 {
            if let Some(Value::String(text)) = map.get("raw_analysis") {
                return Ok(Self::RawText(text.clone()));
            }
        }
        if map.len() == 2 && map.get("status").and_then(Value::as_str) == Some("failed") {
            if let Some(Value::String(error)) = map.get("error") {
                return Ok(Self::Failed { error: error.clone() });
            }
        }
        Ok(Self::Structured(map))
    }
}
