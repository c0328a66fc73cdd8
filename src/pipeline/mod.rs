pub mod runner;

pub use runner::*;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{FrameAnalysis, RequirementsPayload};
use crate::media::{FrameSet, VideoMetadata};
use crate::transcribe::Transcript;

/// The fixed stage sequence. Every stage is entered exactly once per run;
/// a failed stage degrades its output and the run moves on. Cancellation
/// (raised by the observer) is the only early exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FrameExtraction,
    AudioTranscription,
    VisualAnalysis,
    RequirementSynthesis,
    DocumentRendering,
    Persisted,
}

/// Canonical execution order.
pub const STAGES: [Stage; 6] = [
    Stage::FrameExtraction,
    Stage::AudioTranscription,
    Stage::VisualAnalysis,
    Stage::RequirementSynthesis,
    Stage::DocumentRendering,
    Stage::Persisted,
];

impl Stage {
    /// The stage label used in events and logging.
    pub fn label(self) -> &'static str {
        match self {
            Self::FrameExtraction => "frame extraction",
            Self::AudioTranscription => "audio transcription",
            Self::VisualAnalysis => "visual analysis",
            Self::RequirementSynthesis => "requirement synthesis",
            Self::DocumentRendering => "document rendering",
            Self::Persisted => "persist results",
        }
    }

    /// 1-based position in the sequence.
    pub fn index(self) -> usize {
        STAGES.iter().position(|s| *s == self).expect("stage in sequence") + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One progress report per entered stage.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 1-based stage number.
    pub stage_index: usize,
    pub total_stages: usize,
    pub message: String,
    /// Present when the stage degraded.
    pub error: Option<String>,
}

/// Observer seam for CLIs, UIs, and embedders.
///
/// Called once per entered stage, after that stage settled. Returning `true`
/// requests cancellation: the runner aborts before the next stage starts.
pub trait ProgressObserver: Send {
    fn on_progress(&self, event: &ProgressEvent) -> bool;
}

/// Observer that ignores events and never cancels.
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {
    fn on_progress(&self, _event: &ProgressEvent) -> bool {
        false
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("analysis cancelled by observer after {stage}")]
    Cancelled { stage: Stage },
}

/// The per-run accumulator.
///
/// Built incrementally across stages; each stage appends or overwrites its
/// own keys and never reads keys it didn't produce (synthesis reads the
/// transcript + captions, rendering reads the requirements). Degraded stages
/// leave explicit placeholders rather than absent fields. The persisted
/// snapshot drops the frame path list and keeps only its count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub video_metadata: Option<VideoMetadata>,
    #[serde(skip)]
    pub frame_paths: FrameSet,
    pub frame_count: usize,
    pub transcription: Option<Transcript>,
    pub frame_analyses: Vec<FrameAnalysis>,
    pub requirements: Option<RequirementsPayload>,
    pub srs_markdown: Option<PathBuf>,
    pub srs_pdf: Option<PathBuf>,
    pub requirements_json: Option<PathBuf>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            video_metadata: None,
            frame_paths: vec![],
            frame_count: 0,
            transcription: None,
            frame_analyses: vec![],
            requirements: None,
            srs_markdown: None,
            srs_pdf: None,
            requirements_json: None,
        }
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::new()
    }
}
