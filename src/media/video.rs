//! Video stream access via ffmpeg/ffprobe.
//!
//! `VideoSource` is the DI seam between the pipeline and the actual decoder:
//! the production `FfmpegSource` shells out to ffprobe for metadata, streams
//! grayscale frames over a rawvideo pipe for scene scoring, and exports the
//! selected frames as JPEGs with a `select` filter. `MockVideoSource` serves
//! tests and dry runs.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};

use super::MediaError;

/// Downscaled diff resolution. Mean absolute difference is insensitive to
/// resolution, so scene scoring runs on small frames for throughput.
pub const LUMA_WIDTH: u32 = 160;
pub const LUMA_HEIGHT: u32 = 90;

/// Basic stream properties, probed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub fps: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

/// One exported frame: source index, its wall-clock position, and the JPEG
/// on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: u64,
    pub timestamp_seconds: f64,
    pub path: PathBuf,
}

/// An ordered set of exported frames.
pub type FrameSet = Vec<FrameRecord>;

/// A single grayscale frame from the sequential walk.
#[derive(Debug, Clone)]
pub struct LumaFrame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decoder abstraction for one video file.
pub trait VideoSource {
    fn metadata(&self) -> Result<VideoMetadata, MediaError>;

    /// Sequential grayscale walk over all frames, in stream order.
    fn luma_frames(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<LumaFrame, MediaError>> + '_>, MediaError>;

    /// Export the frames at `indices` (ascending) as JPEGs under `out_dir`.
    /// Returned paths match the order of `indices`.
    fn export_frames(&self, indices: &[u64], out_dir: &Path) -> Result<Vec<PathBuf>, MediaError>;

    /// Extract the audio track as a mono 16 kHz WAV under `out_dir`.
    fn extract_audio(&self, out_dir: &Path) -> Result<PathBuf, MediaError>;
}

// ---------------------------------------------------------------------------
// ffprobe JSON output (subset)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rational ("30/1", "24000/1001") or plain decimal rate.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_probe(json: &str) -> Result<VideoMetadata, MediaError> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| MediaError::Probe(e.to_string()))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::InvalidStream("no video stream".into()))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| MediaError::InvalidStream("frame rate unavailable or zero".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::InvalidStream("missing frame dimensions".into())),
    };

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) if n > 0 => n,
        _ => {
            // Some containers omit nb_frames; derive it from the duration.
            let duration = stream
                .duration
                .as_deref()
                .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
                .and_then(|d| d.parse::<f64>().ok())
                .ok_or_else(|| {
                    MediaError::InvalidStream("neither frame count nor duration available".into())
                })?;
            (duration * fps).round() as u64
        }
    };

    Ok(VideoMetadata {
        fps,
        frame_count,
        width,
        height,
        duration_seconds: frame_count as f64 / fps,
    })
}

// ---------------------------------------------------------------------------
// FfmpegSource
// ---------------------------------------------------------------------------

/// Production decoder backed by the ffmpeg/ffprobe binaries.
pub struct FfmpegSource {
    path: PathBuf,
}

impl FfmpegSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn run_tool(tool: &'static str, cmd: &mut Command) -> Result<Vec<u8>, MediaError> {
    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolUnavailable { tool, source: e }
        } else {
            MediaError::Io(e)
        }
    })?;
    if !output.status.success() {
        return Err(MediaError::CommandFailed {
            tool,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output.stdout)
}

/// ffmpeg `select` expression matching exactly the given frame indices.
fn select_expr(indices: &[u64]) -> String {
    indices
        .iter()
        .map(|i| format!("eq(n\\,{i})"))
        .collect::<Vec<_>>()
        .join("+")
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> Result<VideoMetadata, MediaError> {
        let stdout = run_tool(
            "ffprobe",
            Command::new("ffprobe")
                .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
                .arg(&self.path),
        )?;
        parse_probe(&String::from_utf8_lossy(&stdout))
    }

    fn luma_frames(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<LumaFrame, MediaError>> + '_>, MediaError> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .arg("-vf")
            .arg(format!("scale={LUMA_WIDTH}:{LUMA_HEIGHT}"))
            .args(["-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolUnavailable { tool: "ffmpeg", source: e }
                } else {
                    MediaError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::InvalidStream("ffmpeg produced no stdout".into()))?;

        Ok(Box::new(LumaFrameStream {
            child,
            stdout,
            index: 0,
            done: false,
        }))
    }

    fn export_frames(&self, indices: &[u64], out_dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
        if indices.is_empty() {
            return Ok(vec![]);
        }
        std::fs::create_dir_all(out_dir)?;
        let pattern = out_dir.join("frame_%06d.jpg");

        run_tool(
            "ffmpeg",
            Command::new("ffmpeg")
                .args(["-v", "error", "-y", "-i"])
                .arg(&self.path)
                .arg("-vf")
                .arg(format!("select={}", select_expr(indices)))
                .args(["-vsync", "vfr", "-q:v", "2"])
                .arg(&pattern),
        )?;

        // ffmpeg numbers outputs 1..=N in selection order; rename to the
        // source frame index. Reverse order so a target name can never
        // collide with a not-yet-renamed sequence number.
        let mut paths = vec![PathBuf::new(); indices.len()];
        for (k, &index) in indices.iter().enumerate().rev() {
            let produced = out_dir.join(format!("frame_{:06}.jpg", k + 1));
            let target = out_dir.join(format!("frame_{index:06}.jpg"));
            if !produced.exists() {
                return Err(MediaError::InvalidStream(format!(
                    "expected frame {} was not produced (stream shorter than probed?)",
                    k + 1
                )));
            }
            if produced != target {
                std::fs::rename(&produced, &target)?;
            }
            paths[k] = target;
        }
        Ok(paths)
    }

    fn extract_audio(&self, out_dir: &Path) -> Result<PathBuf, MediaError> {
        super::audio::extract_audio(&self.path, out_dir)
    }
}

/// Iterator over the rawvideo grayscale pipe.
struct LumaFrameStream {
    child: Child,
    stdout: ChildStdout,
    index: u64,
    done: bool,
}

impl Iterator for LumaFrameStream {
    type Item = Result<LumaFrame, MediaError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut pixels = vec![0u8; (LUMA_WIDTH * LUMA_HEIGHT) as usize];
        match self.stdout.read_exact(&mut pixels) {
            Ok(()) => {
                let frame = LumaFrame {
                    index: self.index,
                    width: LUMA_WIDTH,
                    height: LUMA_HEIGHT,
                    pixels,
                };
                self.index += 1;
                Some(Ok(frame))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.done = true;
                match self.child.wait() {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some(Err(MediaError::CommandFailed {
                        tool: "ffmpeg",
                        code: status.code(),
                        stderr: read_stderr(&mut self.child),
                    })),
                    Err(e) => Some(Err(MediaError::Io(e))),
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(MediaError::Io(e)))
            }
        }
    }
}

impl Drop for LumaFrameStream {
    fn drop(&mut self) {
        // The walk may stop early (max key frames reached); don't leave the
        // decoder blocked on a full pipe.
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn read_stderr(child: &mut Child) -> String {
    let mut buf = String::new();
    if let Some(stderr) = child.stderr.as_mut() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf
}

// ---------------------------------------------------------------------------
// MockVideoSource
// ---------------------------------------------------------------------------

/// In-memory video source for tests and dry runs.
pub struct MockVideoSource {
    pub meta: VideoMetadata,
    pub luma: Vec<LumaFrame>,
    pub fail_metadata: bool,
    pub fail_export: bool,
    /// Simulate a missing transcoding tool for the audio path.
    pub audio_tool_missing: bool,
}

impl MockVideoSource {
    pub fn new(meta: VideoMetadata) -> Self {
        Self {
            meta,
            luma: vec![],
            fail_metadata: false,
            fail_export: false,
            audio_tool_missing: false,
        }
    }

    /// A synthetic stream of uniformly-lit frames; `levels[i]` is the gray
    /// level of frame i.
    pub fn with_levels(meta: VideoMetadata, levels: &[u8]) -> Self {
        let luma = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| LumaFrame {
                index: i as u64,
                width: 4,
                height: 4,
                pixels: vec![level; 16],
            })
            .collect();
        Self {
            meta,
            luma,
            fail_metadata: false,
            fail_export: false,
            audio_tool_missing: false,
        }
    }
}

impl VideoSource for MockVideoSource {
    fn metadata(&self) -> Result<VideoMetadata, MediaError> {
        if self.fail_metadata {
            return Err(MediaError::InvalidStream("mock metadata failure".into()));
        }
        Ok(self.meta.clone())
    }

    fn luma_frames(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<LumaFrame, MediaError>> + '_>, MediaError> {
        Ok(Box::new(self.luma.iter().cloned().map(Ok)))
    }

    fn export_frames(&self, indices: &[u64], out_dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
        if self.fail_export {
            return Err(MediaError::InvalidStream("mock export failure".into()));
        }
        std::fs::create_dir_all(out_dir)?;
        indices
            .iter()
            .map(|index| {
                let path = out_dir.join(format!("frame_{index:06}.jpg"));
                // Minimal JPEG magic so downstream readers see plausible bytes.
                std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9])?;
                Ok(path)
            })
            .collect()
    }

    fn extract_audio(&self, out_dir: &Path) -> Result<PathBuf, MediaError> {
        if self.audio_tool_missing {
            return Err(MediaError::ToolUnavailable {
                tool: "ffmpeg",
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock"),
            });
        }
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join("audio.wav");
        std::fs::write(&path, b"RIFF\x00\x00\x00\x00WAVE")?;
        Ok(path)
    }
}
