//! Per-frame visual captioning.
//!
//! The batch is a sequential loop with per-frame error isolation: one
//! frame's failure is recorded in its own slot and never stops the rest.
//! Output order always matches input order.

use std::sync::Arc;

use base64::Engine as _;

use crate::media::FrameRecord;

use super::prompt::CAPTION_PROMPT;
use super::types::{FrameAnalysis, VisionClient};

pub struct FrameCaptioner {
    vision: Arc<dyn VisionClient>,
    model: String,
    vision_on_cpu: bool,
    /// One-time CPU notice, owned by the instance.
    cpu_notice_shown: bool,
}

impl FrameCaptioner {
    pub fn new(vision: Arc<dyn VisionClient>, model: &str, vision_on_cpu: bool) -> Self {
        Self {
            vision,
            model: model.to_string(),
            vision_on_cpu,
            cpu_notice_shown: false,
        }
    }

    /// Caption every frame, in order. Infallible at the batch level: failed
    /// frames carry an `Error: ...` placeholder in their slot.
    pub fn caption_frames(&mut self, frames: &[FrameRecord]) -> Vec<FrameAnalysis> {
        if self.vision_on_cpu && !self.cpu_notice_shown {
            tracing::info!("Vision model pinned to CPU; captioning may be slower");
            self.cpu_notice_shown = true;
        }

        let mut results = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            tracing::info!(
                frame = i + 1,
                total = frames.len(),
                path = %frame.path.display(),
                "Captioning frame"
            );

            let analysis = match self.caption_one(frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(frame = i + 1, error = %e, "Frame caption failed");
                    format!("Error: {e}")
                }
            };

            results.push(FrameAnalysis {
                index: frame.index,
                frame: frame.path.clone(),
                analysis,
            });
        }
        results
    }

    fn caption_one(&self, frame: &FrameRecord) -> Result<String, super::AnalysisError> {
        let bytes = std::fs::read(&frame.path)
            .map_err(|e| super::AnalysisError::Image(format!("{}: {e}", frame.path.display())))?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.vision
            .describe_image(&self.model, CAPTION_PROMPT, &image_base64)
    }
}
