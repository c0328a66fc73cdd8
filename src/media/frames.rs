//! Frame selection: fixed-interval sampling and scene-change detection.
//!
//! Selection is pure logic over probed metadata or the grayscale walk; the
//! decoder only gets involved to export whatever was selected.

use std::path::Path;

use super::video::{FrameRecord, FrameSet, LumaFrame, VideoSource};
use super::MediaError;

/// Scene-change score above which a frame becomes a key frame.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 30.0;
/// Upper bound on key frames per run.
pub const DEFAULT_MAX_KEY_FRAMES: usize = 15;

/// How frames are picked out of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameMode {
    /// One frame every `seconds` of video time.
    Interval { seconds: f64 },
    /// Frames whose difference to their predecessor exceeds `threshold`,
    /// capped at `max_frames`.
    SceneChange { threshold: f64, max_frames: usize },
}

impl Default for FrameMode {
    fn default() -> Self {
        Self::SceneChange {
            threshold: DEFAULT_SCENE_THRESHOLD,
            max_frames: DEFAULT_MAX_KEY_FRAMES,
        }
    }
}

/// Frame indices for interval sampling: 0, stride, 2·stride, … where
/// stride = fps × interval rounded to whole frames.
pub fn interval_indices(
    fps: f64,
    frame_count: u64,
    interval_seconds: f64,
) -> Result<Vec<u64>, MediaError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(MediaError::InvalidStream(format!(
            "frame rate unavailable or zero ({fps})"
        )));
    }
    let stride = (fps * interval_seconds).round() as u64;
    if stride == 0 {
        return Err(MediaError::InvalidStream(format!(
            "sampling stride rounds to zero (fps {fps}, interval {interval_seconds}s)"
        )));
    }
    Ok((0..frame_count).step_by(stride as usize).collect())
}

/// Mean absolute difference between two grayscale frames.
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let sum: u64 = a[..len]
        .iter()
        .zip(&b[..len])
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    sum as f64 / len as f64
}

/// Walk the grayscale stream and pick frames whose diff score against the
/// previous frame exceeds `threshold`. Stops at `max_frames` or end of
/// stream. The first frame has no predecessor and is never selected.
pub fn key_frame_indices(
    frames: impl Iterator<Item = Result<LumaFrame, MediaError>>,
    threshold: f64,
    max_frames: usize,
) -> Result<Vec<u64>, MediaError> {
    let mut selected = Vec::new();
    let mut prev: Option<LumaFrame> = None;

    for frame in frames {
        if selected.len() >= max_frames {
            break;
        }
        let frame = frame?;
        if let Some(ref prev) = prev {
            let score = mean_abs_diff(&prev.pixels, &frame.pixels);
            if score > threshold {
                tracing::debug!(index = frame.index, score, "Key frame");
                selected.push(frame.index);
            }
        }
        prev = Some(frame);
    }

    Ok(selected)
}

/// Extract frames from `source` per `mode`, exporting JPEGs under `out_dir`.
pub fn extract_frames(
    source: &dyn VideoSource,
    mode: &FrameMode,
    out_dir: &Path,
) -> Result<FrameSet, MediaError> {
    let meta = source.metadata()?;

    let indices = match mode {
        FrameMode::Interval { seconds } => {
            tracing::info!(fps = meta.fps, interval = seconds, "Sampling frames at fixed interval");
            interval_indices(meta.fps, meta.frame_count, *seconds)?
        }
        FrameMode::SceneChange { threshold, max_frames } => {
            tracing::info!(threshold, max_frames, "Detecting scene changes");
            key_frame_indices(source.luma_frames()?, *threshold, *max_frames)?
        }
    };

    let paths = source.export_frames(&indices, out_dir)?;

    let frames = indices
        .iter()
        .zip(paths)
        .map(|(&index, path)| FrameRecord {
            index,
            timestamp_seconds: index as f64 / meta.fps,
            path,
        })
        .collect::<Vec<_>>();

    tracing::info!(count = frames.len(), "Frame extraction complete");
    Ok(frames)
}
