//! meetscribe CLI — thin shell around the analysis pipeline.
//!
//! The only fatal pre-flight condition lives here: a video path that does
//! not exist exits non-zero before the run starts. Everything downstream
//! degrades inside the pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use meetscribe::analysis::EndpointClient;
use meetscribe::config::{self, ConfigOverrides, EffectiveConfig, Environment, TranscriptionBackend};
use meetscribe::media::{FfmpegSource, FrameMode, DEFAULT_MAX_KEY_FRAMES, DEFAULT_SCENE_THRESHOLD};
use meetscribe::pipeline::{AnalysisRunner, ProgressEvent, ProgressObserver, RunOptions};
use meetscribe::profiles;
use meetscribe::transcribe::{
    LocalWhisper, RemoteTranscriber, SpeechToText, UnavailableBackend, DEFAULT_REMOTE_BASE,
};

/// Analyze a meeting recording and generate SRS documentation.
#[derive(Parser, Debug)]
#[command(name = "meetscribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the meeting video file
    #[arg(long, required_unless_present = "list_profiles")]
    video: Option<PathBuf>,

    /// Inference endpoint base URL (Ollama-compatible)
    #[arg(long)]
    endpoint: Option<String>,

    /// Text model for requirement synthesis
    #[arg(long)]
    text_model: Option<String>,

    /// Vision model for frame captioning
    #[arg(long)]
    vision_model: Option<String>,

    /// Local whisper model size: tiny, base, small, medium, large-v3
    #[arg(long)]
    whisper_model: Option<String>,

    /// Named hardware profile (see --list-profiles)
    #[arg(long)]
    profile: Option<String>,

    /// List built-in hardware profiles and exit
    #[arg(long)]
    list_profiles: bool,

    /// Project name for the SRS document
    #[arg(long, default_value = "Meeting Project")]
    project: String,

    /// Output directory for generated files
    #[arg(long)]
    output: Option<PathBuf>,

    /// Frame extraction interval in seconds (with --no-key-frames)
    #[arg(long, default_value_t = 10.0)]
    interval: f64,

    /// Use fixed-interval extraction instead of scene-change detection
    #[arg(long)]
    no_key_frames: bool,

    /// Maximum number of key frames to extract
    #[arg(long, default_value_t = DEFAULT_MAX_KEY_FRAMES)]
    max_frames: usize,

    /// Maximum number of frames to analyze with the vision model
    #[arg(long, default_value_t = 10)]
    max_analyze: usize,

    /// Scene-change detection threshold
    #[arg(long, default_value_t = DEFAULT_SCENE_THRESHOLD)]
    threshold: f64,

    /// Use a hosted transcription model (e.g. whisper-1) instead of local whisper
    #[arg(long)]
    remote_model: Option<String>,

    /// API credential for hosted transcription
    #[arg(long)]
    api_key: Option<String>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    meetscribe::init_tracing();

    let cli = Cli::parse();

    if cli.list_profiles {
        for name in profiles::list() {
            println!("{name:14} {}", profiles::describe(name));
        }
        return ExitCode::SUCCESS;
    }

    let video = cli.video.clone().expect("clap enforces --video");
    if !video.exists() {
        eprintln!("Error: Video file not found: {}", video.display());
        return ExitCode::FAILURE;
    }

    let overrides = ConfigOverrides {
        endpoint_url: cli.endpoint.clone(),
        text_model: cli.text_model.clone(),
        vision_model: cli.vision_model.clone(),
        whisper_model: cli.whisper_model.clone(),
        vision_on_cpu: None,
        output_dir: cli.output.clone(),
        remote_transcription_model: cli.remote_model.clone(),
        api_key: cli.api_key.clone(),
    };
    let config = config::resolve(&overrides, cli.profile.as_deref(), &Environment::from_env());

    println!("meetscribe v{}", meetscribe::APP_VERSION);
    println!("  Endpoint:      {}", config.endpoint_url);
    println!("  Text model:    {}", config.text_model);
    println!("  Vision model:  {}", config.vision_model);
    println!("  Whisper model: {}", config.whisper_model);
    println!("  Output:        {}", config.output_dir.display());
    println!();

    let mode = if cli.no_key_frames {
        FrameMode::Interval { seconds: cli.interval }
    } else {
        FrameMode::SceneChange {
            threshold: cli.threshold,
            max_frames: cli.max_frames,
        }
    };

    let endpoint = Arc::new(EndpointClient::with_default_timeout(&config.endpoint_url));
    let transcriber = build_transcriber(&config);

    let mut runner = AnalysisRunner::new(
        config.clone(),
        Box::new(FfmpegSource::new(&video)),
        transcriber,
        endpoint.clone(),
        endpoint,
        Box::new(ConsoleObserver),
    );

    let opts = RunOptions {
        mode,
        max_frames_to_analyze: cli.max_analyze,
        project_name: cli.project.clone(),
    };

    match runner.run(&opts) {
        Ok(result) => {
            println!();
            println!("Analysis complete. Generated files:");
            if let Some(path) = result.srs_markdown {
                println!("  - SRS (Markdown): {}", path.display());
            }
            if let Some(path) = result.srs_pdf {
                println!("  - SRS (PDF): {}", path.display());
            }
            if let Some(path) = result.requirements_json {
                println!("  - Requirements (JSON): {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\n{e}");
            ExitCode::FAILURE
        }
    }
}

/// Build the configured speech-to-text backend, falling back to a stand-in
/// that degrades the transcription stage when construction fails.
fn build_transcriber(config: &EffectiveConfig) -> Box<dyn SpeechToText + Send> {
    match &config.transcription {
        TranscriptionBackend::Local => match LocalWhisper::new(&config.whisper_model) {
            Ok(whisper) => Box::new(whisper),
            Err(e) => {
                tracing::warn!(error = %e, "Local transcription unavailable");
                Box::new(UnavailableBackend::new(e.to_string()))
            }
        },
        TranscriptionBackend::Remote { model, credential } => {
            match RemoteTranscriber::new(DEFAULT_REMOTE_BASE, model, credential.as_deref()) {
                Ok(remote) => Box::new(remote),
                Err(e) => {
                    // Missing credential is a configuration error; surface it
                    // loudly but let the run degrade rather than abort.
                    tracing::warn!(error = %e, "Remote transcription unavailable");
                    Box::new(UnavailableBackend::new(e.to_string()))
                }
            }
        }
    }
}

/// Prints progress as `[ 33%] message`, mirroring events one line each.
struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_progress(&self, event: &ProgressEvent) -> bool {
        let percent = (event.stage_index as f64 / event.total_stages as f64) * 100.0;
        match &event.error {
            Some(error) => println!("[{percent:3.0}%] {} — {error}", event.message),
            None => println!("[{percent:3.0}%] {}", event.message),
        }
        false
    }
}
