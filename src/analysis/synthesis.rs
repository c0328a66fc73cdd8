//! Requirement synthesis from transcript + captions.
//!
//! One generation call, then a best-effort parse: fenced or bare JSON
//! objects become the structured shape, anything else is kept as raw text.
//! A failed generation becomes the error shape. None of the three outcomes
//! aborts the run.

use std::sync::Arc;

use serde_json::Value;

use super::prompt::{build_synthesis_prompt, SYNTHESIS_SYSTEM};
use super::types::{FrameAnalysis, LlmClient, RequirementsPayload};

pub struct RequirementSynthesizer {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl RequirementSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, model: &str) -> Self {
        Self { llm, model: model.to_string() }
    }

    /// Synthesize the requirements payload. Always returns a payload;
    /// failure modes are encoded in its shape.
    pub fn synthesize(
        &self,
        transcript_text: &str,
        frame_analyses: &[FrameAnalysis],
    ) -> RequirementsPayload {
        let prompt = build_synthesis_prompt(transcript_text, frame_analyses);

        tracing::info!(model = %self.model, prompt_chars = prompt.len(), "Generating requirements");

        match self.llm.generate(&self.model, &prompt, SYNTHESIS_SYSTEM) {
            Ok(content) => parse_requirements(&content),
            Err(e) => {
                tracing::warn!(error = %e, "Requirement generation failed");
                RequirementsPayload::Failed { error: e.to_string() }
            }
        }
    }
}

/// Parse a model response into the structured shape if possible, the raw
/// text fallback otherwise.
pub fn parse_requirements(content: &str) -> RequirementsPayload {
    let candidate = strip_json_fence(content);
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => RequirementsPayload::Structured(map),
        _ => {
            tracing::info!("Model response is not a JSON object; keeping raw text");
            RequirementsPayload::RawText(content.to_string())
        }
    }
}

/// If the response wraps its JSON in a ```json fence, return the fenced
/// body; otherwise return the trimmed input.
fn strip_json_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    trimmed
}
