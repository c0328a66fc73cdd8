pub mod captioner;
pub mod client;
pub mod prompt;
pub mod synthesis;
pub mod types;

pub use captioner::*;
pub use client::*;
pub use synthesis::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("inference endpoint is not reachable at {0}")]
    Connection(String),

    #[error("inference endpoint returned status {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("response parsing error: {0}")]
    ResponseParsing(String),

    #[error("cannot read frame image: {0}")]
    Image(String),
}
