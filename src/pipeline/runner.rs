//! The analysis pipeline runner.
//!
//! Drives the five processing stages plus the final persist over injected
//! adapters. The runner alone decides degrade-vs-abort: adapters return
//! typed failures, and every failure short of an observer cancellation
//! degrades that stage's output and moves on. Even a run where every AI
//! stage failed still renders a document and persists a results file.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::{
    FrameCaptioner, LlmClient, RequirementSynthesizer, RequirementsPayload, VisionClient,
};
use crate::config::EffectiveConfig;
use crate::media::{self, FrameMode, MediaError, VideoSource};
use crate::transcribe::{SpeechToText, Transcript, TranscriptStatus};

use super::{AnalysisResult, PipelineError, ProgressEvent, ProgressObserver, Stage, STAGES};

/// Results file name, fixed relative to the output directory.
pub const RESULTS_FILE: &str = "analysis_results.json";

/// Per-run knobs that are not configuration: how to pick frames, how many
/// to send to the vision model, and what to call the project.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: FrameMode,
    /// Upper bound on frames sent for captioning; caps inference cost
    /// independently of how many frames extraction produced.
    pub max_frames_to_analyze: usize,
    pub project_name: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: FrameMode::default(),
            max_frames_to_analyze: 10,
            project_name: "Meeting Project".to_string(),
        }
    }
}

pub struct AnalysisRunner {
    config: EffectiveConfig,
    video: Box<dyn VideoSource + Send>,
    transcriber: Box<dyn SpeechToText + Send>,
    vision: Arc<dyn VisionClient>,
    llm: Arc<dyn LlmClient>,
    observer: Box<dyn ProgressObserver>,
}

impl AnalysisRunner {
    pub fn new(
        config: EffectiveConfig,
        video: Box<dyn VideoSource + Send>,
        transcriber: Box<dyn SpeechToText + Send>,
        vision: Arc<dyn VisionClient>,
        llm: Arc<dyn LlmClient>,
        observer: Box<dyn ProgressObserver>,
    ) -> Self {
        Self {
            config,
            video,
            transcriber,
            vision,
            llm,
            observer,
        }
    }

    /// Run the full pipeline.
    ///
    /// Always returns a complete `AnalysisResult` — degraded stages leave
    /// placeholders — unless the observer cancels, which aborts before the
    /// next stage starts.
    pub fn run(&mut self, opts: &RunOptions) -> Result<AnalysisResult, PipelineError> {
        let mut result = AnalysisResult::new();
        tracing::info!(
            run_id = %result.run_id,
            output_dir = %self.config.output_dir.display(),
            "Starting meeting analysis"
        );

        self.extract_frames(&mut result, opts)?;
        self.transcribe_audio(&mut result)?;
        self.analyze_frames(&mut result, opts)?;
        self.synthesize_requirements(&mut result)?;
        self.render_documents(&mut result, opts)?;
        self.persist(&result);

        tracing::info!(run_id = %result.run_id, "Analysis complete");
        Ok(result)
    }

    // ── Stage 1: frame extraction ───────────────────────────

    fn extract_frames(
        &self,
        result: &mut AnalysisResult,
        opts: &RunOptions,
    ) -> Result<(), PipelineError> {
        let frames_dir = self.config.output_dir.join("frames");

        let outcome = self.video.metadata().and_then(|meta| {
            let frames = media::extract_frames(self.video.as_ref(), &opts.mode, &frames_dir)?;
            Ok((meta, frames))
        });

        match outcome {
            Ok((meta, frames)) => {
                result.video_metadata = Some(meta);
                result.frame_count = frames.len();
                result.frame_paths = frames;
                self.emit(
                    Stage::FrameExtraction,
                    format!("Extracted {} frames", result.frame_count),
                    None,
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Frame extraction degraded");
                self.emit(
                    Stage::FrameExtraction,
                    "Frame extraction failed".into(),
                    Some(e.to_string()),
                )
            }
        }
    }

    // ── Stage 2: audio + transcription ──────────────────────

    fn transcribe_audio(&self, result: &mut AnalysisResult) -> Result<(), PipelineError> {
        let audio_dir = self.config.output_dir.join("audio");

        let transcript = match self.video.extract_audio(&audio_dir) {
            Ok(audio_path) => match self.transcriber.transcribe(&audio_path) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(error = %e, "Transcription degraded");
                    Transcript::failed(&e.to_string())
                }
            },
            Err(e @ MediaError::ToolUnavailable { .. }) => {
                tracing::warn!(error = %e, "Audio extraction skipped");
                Transcript::skipped("Install ffmpeg for audio support.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "Audio extraction degraded");
                Transcript::failed(&e.to_string())
            }
        };

        let (message, error) = match transcript.status {
            TranscriptStatus::Complete => (
                format!("Transcription complete: {} characters", transcript.text.len()),
                None,
            ),
            TranscriptStatus::Skipped => {
                ("Audio extraction skipped".to_string(), Some(transcript.text.clone()))
            }
            TranscriptStatus::Failed => {
                ("Transcription failed".to_string(), Some(transcript.text.clone()))
            }
        };

        result.transcription = Some(transcript);
        self.emit(Stage::AudioTranscription, message, error)
    }

    // ── Stage 3: visual analysis ────────────────────────────

    fn analyze_frames(
        &self,
        result: &mut AnalysisResult,
        opts: &RunOptions,
    ) -> Result<(), PipelineError> {
        let cap = opts.max_frames_to_analyze.min(result.frame_paths.len());
        if result.frame_paths.len() > cap {
            tracing::info!(
                analyzing = cap,
                extracted = result.frame_paths.len(),
                "Bounding visual analysis"
            );
        }
        let to_analyze = &result.frame_paths[..cap];

        let mut captioner = FrameCaptioner::new(
            self.vision.clone(),
            &self.config.vision_model,
            self.config.vision_on_cpu,
        );
        result.frame_analyses = captioner.caption_frames(to_analyze);

        let failed = result.frame_analyses.iter().filter(|f| f.is_error()).count();
        let error = (failed > 0 && failed == result.frame_analyses.len())
            .then(|| "all frame captions failed".to_string());
        let message = if result.frame_analyses.is_empty() {
            "No frames to analyze".to_string()
        } else {
            format!("Analyzed {} frames", result.frame_analyses.len())
        };
        self.emit(Stage::VisualAnalysis, message, error)
    }

    // ── Stage 4: requirement synthesis ──────────────────────

    fn synthesize_requirements(&self, result: &mut AnalysisResult) -> Result<(), PipelineError> {
        let transcript_text = result
            .transcription
            .as_ref()
            .map(|t| t.text.as_str())
            .unwrap_or_default();

        let synthesizer = RequirementSynthesizer::new(self.llm.clone(), &self.config.text_model);
        let payload = synthesizer.synthesize(transcript_text, &result.frame_analyses);

        let (message, error) = match &payload {
            RequirementsPayload::Failed { error } => {
                ("Requirement synthesis failed".to_string(), Some(error.clone()))
            }
            RequirementsPayload::RawText(_) => (
                "Requirements generated (unstructured text)".to_string(),
                None,
            ),
            RequirementsPayload::Structured(_) => ("Requirements generated".to_string(), None),
        };

        result.requirements = Some(payload);
        self.emit(Stage::RequirementSynthesis, message, error)
    }

    // ── Stage 5: document rendering ─────────────────────────

    fn render_documents(
        &self,
        result: &mut AnalysisResult,
        opts: &RunOptions,
    ) -> Result<(), PipelineError> {
        // Rendering always runs, even on a fully degraded payload; the
        // document then says so explicitly.
        let payload = result.requirements.clone().unwrap_or(RequirementsPayload::Failed {
            error: "requirement synthesis did not run".into(),
        });
        let out_dir = &self.config.output_dir;
        let project = &opts.project_name;
        let mut errors: Vec<String> = Vec::new();

        match crate::report::render_markdown(&payload, project, out_dir) {
            Ok(path) => result.srs_markdown = Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Markdown rendering failed");
                errors.push(format!("markdown: {e}"));
            }
        }

        result.srs_pdf = crate::report::render_pdf(&payload, project, out_dir);

        match crate::report::save_json(&payload, project, out_dir) {
            Ok(path) => result.requirements_json = Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Requirements JSON failed");
                errors.push(format!("json: {e}"));
            }
        }

        let artifacts = [
            result.srs_markdown.is_some(),
            result.srs_pdf.is_some(),
            result.requirements_json.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        self.emit(
            Stage::DocumentRendering,
            format!("Generated {artifacts} document artifact(s)"),
            (!errors.is_empty()).then(|| errors.join("; ")),
        )
    }

    // ── Stage 6: persist ────────────────────────────────────

    fn persist(&self, result: &AnalysisResult) {
        let persist_error = write_results_file(result, &self.config.output_dir)
            .err()
            .map(|e| e.to_string());

        if let Some(ref e) = persist_error {
            tracing::error!(error = %e, "Failed to persist results file");
        }

        // The run is complete at this point; a cancel request has nothing
        // left to abort, so the observer's return value is ignored here.
        let event = ProgressEvent {
            stage: Stage::Persisted,
            stage_index: Stage::Persisted.index(),
            total_stages: STAGES.len(),
            message: format!(
                "Results saved to {}",
                self.config.output_dir.join(RESULTS_FILE).display()
            ),
            error: persist_error,
        };
        let _ = self.observer.on_progress(&event);
    }

    // ── Event delivery ──────────────────────────────────────

    fn emit(
        &self,
        stage: Stage,
        message: String,
        error: Option<String>,
    ) -> Result<(), PipelineError> {
        let event = ProgressEvent {
            stage,
            stage_index: stage.index(),
            total_stages: STAGES.len(),
            message,
            error,
        };
        if self.observer.on_progress(&event) {
            tracing::warn!(stage = %stage, "Cancellation requested by observer");
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

/// Serialize the accumulator to `{output_dir}/analysis_results.json`.
fn write_results_file(result: &AnalysisResult, output_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(output_dir.join(RESULTS_FILE), json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentObserver;
    use crate::analysis::{MockLlmClient, MockVisionClient};
    use crate::config::{ConfigOverrides, Environment};
    use crate::media::{MockVideoSource, VideoMetadata};
    use crate::transcribe::{Segment, TranscriptionError, UnavailableBackend};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn meta() -> VideoMetadata {
        VideoMetadata {
            fps: 10.0,
            frame_count: 300,
            width: 640,
            height: 480,
            duration_seconds: 30.0,
        }
    }

    /// Scene stream with three hard cuts.
    fn video_with_scenes() -> MockVideoSource {
        MockVideoSource::with_levels(meta(), &[10, 10, 200, 200, 10, 10, 200, 200])
    }

    struct FixedTranscript(Transcript);

    impl SpeechToText for FixedTranscript {
        fn transcribe(&self, _audio: &Path) -> Result<Transcript, TranscriptionError> {
            Ok(self.0.clone())
        }
    }

    fn transcript() -> Transcript {
        Transcript {
            text: "Build a login page".into(),
            language: Some("en".into()),
            duration_seconds: Some(30.0),
            segments: vec![Segment {
                start: 0.0,
                end: 2.0,
                text: "Build a login page".into(),
            }],
            status: TranscriptStatus::Complete,
        }
    }

    fn config(output_dir: PathBuf) -> EffectiveConfig {
        crate::config::resolve(
            &ConfigOverrides {
                output_dir: Some(output_dir),
                ..ConfigOverrides::default()
            },
            None,
            &Environment::default(),
        )
    }

    fn runner_with(
        video: MockVideoSource,
        transcriber: Box<dyn SpeechToText + Send>,
        llm_response: &str,
        output_dir: PathBuf,
        observer: Box<dyn ProgressObserver>,
    ) -> AnalysisRunner {
        AnalysisRunner::new(
            config(output_dir),
            Box::new(video),
            transcriber,
            Arc::new(MockVisionClient::new(&["login form screenshot"])),
            Arc::new(MockLlmClient::new(llm_response)),
            observer,
        )
    }

    /// Records every event; optionally cancels at a given stage index.
    struct RecordingObserver {
        events: Arc<Mutex<Vec<ProgressEvent>>>,
        cancel_at: Option<usize>,
        seen: AtomicUsize,
    }

    impl RecordingObserver {
        fn new(events: Arc<Mutex<Vec<ProgressEvent>>>) -> Self {
            Self { events, cancel_at: None, seen: AtomicUsize::new(0) }
        }

        fn cancelling_at(events: Arc<Mutex<Vec<ProgressEvent>>>, stage_index: usize) -> Self {
            Self { events, cancel_at: Some(stage_index), seen: AtomicUsize::new(0) }
        }
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, event: &ProgressEvent) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push(event.clone());
            self.cancel_at == Some(event.stage_index)
        }
    }

    // ── Happy path ───────────────────────────────────────

    #[test]
    fn full_run_with_structured_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(Mutex::new(vec![]));
        let mut runner = runner_with(
            video_with_scenes(),
            Box::new(FixedTranscript(transcript())),
            r#"{"functional_requirements": ["Login page"]}"#,
            dir.path().to_path_buf(),
            Box::new(RecordingObserver::new(events.clone())),
        );

        let result = runner.run(&RunOptions::default()).unwrap();

        assert!(result.video_metadata.is_some());
        assert!(result.frame_count > 0);
        assert_eq!(
            result.transcription.as_ref().unwrap().status,
            TranscriptStatus::Complete
        );
        assert!(!result.frame_analyses.is_empty());
        assert!(matches!(
            result.requirements,
            Some(RequirementsPayload::Structured(_))
        ));
        assert!(result.srs_markdown.as_ref().unwrap().exists());
        assert!(result.requirements_json.as_ref().unwrap().exists());
        assert!(dir.path().join(RESULTS_FILE).exists());

        // Exactly one event per stage, in order.
        let events = events.lock().unwrap();
        let indices: Vec<usize> = events.iter().map(|e| e.stage_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
        assert!(events.iter().all(|e| e.total_stages == 6));
    }

    // ── Degraded paths ───────────────────────────────────

    #[test]
    fn missing_audio_tool_still_reaches_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = video_with_scenes();
        video.audio_tool_missing = true;
        let events = Arc::new(Mutex::new(vec![]));
        let mut runner = runner_with(
            video,
            Box::new(UnavailableBackend::new("unused")),
            "not json",
            dir.path().to_path_buf(),
            Box::new(RecordingObserver::new(events.clone())),
        );

        let result = runner.run(&RunOptions::default()).unwrap();

        // Transcription slot holds the skipped placeholder, not nothing.
        let t = result.transcription.as_ref().unwrap();
        assert_eq!(t.status, TranscriptStatus::Skipped);
        assert!(t.text.contains("not available"));

        // The results file exists and carries the status marker.
        let persisted = std::fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap();
        assert!(persisted.contains("\"skipped\""));

        // Markdown artifact was still produced.
        assert!(result.srs_markdown.as_ref().unwrap().exists());

        // All six stages reported.
        assert_eq!(events.lock().unwrap().len(), 6);
    }

    #[test]
    fn fully_degraded_run_still_produces_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = MockVideoSource::new(meta());
        video.fail_metadata = true;
        video.audio_tool_missing = true;
        let mut runner = AnalysisRunner::new(
            config(dir.path().to_path_buf()),
            Box::new(video),
            Box::new(UnavailableBackend::new("no backend")),
            Arc::new(MockVisionClient::new(&[])),
            Arc::new(MockLlmClient::failing("endpoint down")),
            Box::new(SilentObserver),
        );

        let result = runner.run(&RunOptions::default()).unwrap();

        assert!(result.video_metadata.is_none());
        assert_eq!(result.frame_count, 0);
        assert!(matches!(
            result.requirements,
            Some(RequirementsPayload::Failed { .. })
        ));
        // The worst case still renders a document and persists the record.
        assert!(result.srs_markdown.as_ref().unwrap().exists());
        assert!(result.requirements_json.as_ref().unwrap().exists());
        assert!(dir.path().join(RESULTS_FILE).exists());

        let md = std::fs::read_to_string(result.srs_markdown.unwrap()).unwrap();
        assert!(md.contains("Synthesis Status"));
    }

    #[test]
    fn invalid_json_synthesis_degrades_to_raw_analysis_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_with(
            video_with_scenes(),
            Box::new(FixedTranscript(transcript())),
            "Here are the requirements in plain prose.",
            dir.path().to_path_buf(),
            Box::new(SilentObserver),
        );

        let result = runner.run(&RunOptions::default()).unwrap();

        assert_eq!(
            result.requirements,
            Some(RequirementsPayload::RawText(
                "Here are the requirements in plain prose.".into()
            ))
        );
        let md = std::fs::read_to_string(result.srs_markdown.unwrap()).unwrap();
        assert!(md.contains("Raw Analysis"));
    }

    // ── Bounding ─────────────────────────────────────────

    #[test]
    fn visual_analysis_is_bounded_by_max_frames_to_analyze() {
        let dir = tempfile::tempdir().unwrap();
        // Alternating levels: every second frame is a scene change.
        let levels: Vec<u8> = (0..40).map(|i| if i % 2 == 0 { 0 } else { 200 }).collect();
        let video = MockVideoSource::with_levels(meta(), &levels);
        let mut runner = runner_with(
            video,
            Box::new(FixedTranscript(transcript())),
            "{}",
            dir.path().to_path_buf(),
            Box::new(SilentObserver),
        );

        let opts = RunOptions {
            mode: FrameMode::SceneChange { threshold: 30.0, max_frames: 15 },
            max_frames_to_analyze: 3,
            project_name: "Bounded".into(),
        };
        let result = runner.run(&opts).unwrap();

        assert!(result.frame_count > 3);
        assert_eq!(result.frame_analyses.len(), 3);
    }

    // ── Cancellation ─────────────────────────────────────

    #[test]
    fn observer_cancellation_aborts_before_next_stage() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(Mutex::new(vec![]));
        let mut runner = runner_with(
            video_with_scenes(),
            Box::new(FixedTranscript(transcript())),
            "{}",
            dir.path().to_path_buf(),
            Box::new(RecordingObserver::cancelling_at(events.clone(), 2)),
        );

        let err = runner.run(&RunOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cancelled { stage: Stage::AudioTranscription }
        ));

        // Stages 3..6 never ran; no results file was written.
        assert_eq!(events.lock().unwrap().len(), 2);
        assert!(!dir.path().join(RESULTS_FILE).exists());
    }

    #[test]
    fn cancellation_at_persisted_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(Mutex::new(vec![]));
        let mut runner = runner_with(
            video_with_scenes(),
            Box::new(FixedTranscript(transcript())),
            "{}",
            dir.path().to_path_buf(),
            Box::new(RecordingObserver::cancelling_at(events.clone(), 6)),
        );

        // The run is already complete when the Persisted event fires.
        let result = runner.run(&RunOptions::default()).unwrap();
        assert!(dir.path().join(RESULTS_FILE).exists());
        assert!(result.requirements.is_some());
    }

    // ── Threading ────────────────────────────────────────

    #[test]
    fn runner_can_move_to_a_worker_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<AnalysisRunner>();
    }

    // ── Persisted snapshot shape ─────────────────────────

    #[test]
    fn results_file_has_count_but_no_frame_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_with(
            video_with_scenes(),
            Box::new(FixedTranscript(transcript())),
            "{}",
            dir.path().to_path_buf(),
            Box::new(SilentObserver),
        );

        let result = runner.run(&RunOptions::default()).unwrap();
        assert!(!result.frame_paths.is_empty());

        let persisted = std::fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&persisted).unwrap();
        assert!(value.get("frame_paths").is_none());
        assert_eq!(
            value["frame_count"].as_u64().unwrap() as usize,
            result.frame_count
        );
        assert!(value.get("run_id").is_some());
    }
}
