pub mod audio;
pub mod frames;
pub mod video;

pub use audio::*;
pub use frames::*;
pub use video::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} not found on PATH: {source}")]
    ToolUnavailable {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("cannot read video stream: {0}")]
    InvalidStream(String),

    #[error("{tool} exited with code {code:?}: {stderr}")]
    CommandFailed {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    Probe(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
