use crate::ffmpeg_process::ProcessFailure;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("input file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    /// `hint` tells the user how to recover.
    #[error("{tool} is not installed or not in PATH")]
    ToolNotFound { tool: String, hint: String },

    #[error("transcode failed: {0}")]
    TranscodeFailed(ProcessFailure),

    /// Both the transcoder and the image tool (when present) failed to split the source.
    #[error("failed to extract frames: {}", describe_extraction(.primary, .fallback))]
    ExtractionFailed {
        primary: ProcessFailure,
        fallback: Option<ProcessFailure>,
    },

    #[error("no frames extracted from {}", .0.display())]
    NoFramesExtracted(PathBuf),

    #[error("failed to get dimensions of {}: {reason}", .path.display())]
    DimensionProbe { path: PathBuf, reason: String },

    #[error("video creation failed: {0}")]
    VideoCreationFailed(ProcessFailure),

    #[error("failed to create scratch directory: {0}")]
    ScratchDir(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_extraction(primary: &ProcessFailure, fallback: &Option<ProcessFailure>) -> String {
    match fallback {
        Some(fallback) => fallback.to_string(),
        None => primary.to_string(),
    }
}

impl ConvertError {
    /// Captured process output for diagnostics, when the error came from an external tool.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            ConvertError::TranscodeFailed(f) | ConvertError::VideoCreationFailed(f) => {
                Some(f.output.as_str())
            }
            ConvertError::ExtractionFailed { primary, fallback } => Some(
                fallback
                    .as_ref()
                    .map(|f| f.output.as_str())
                    .unwrap_or(primary.output.as_str()),
            ),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            ConvertError::ToolNotFound { hint, .. } => Some(hint.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
