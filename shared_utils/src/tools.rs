//! External tool discovery
//!
//! ffmpeg is required. ImageMagick is optional and only used as the fallback
//! frame extractor, so its absence is a warning.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{ConvertError, Result};
use crate::ffmpeg_process::ToolInvocation;

pub const TRANSCODER: &str = "ffmpeg";
const TRANSCODER_HINT: &str = "Please install ffmpeg first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageToolKind {
    /// ImageMagick 7 `magick` front-end.
    Magick,
    /// ImageMagick 6 `convert`.
    Convert,
}

impl ImageToolKind {
    pub fn program(self) -> &'static str {
        match self {
            ImageToolKind::Magick => "magick",
            ImageToolKind::Convert => "convert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTool {
    /// Resolved executable.
    pub program: PathBuf,
    pub kind: ImageToolKind,
}

impl ImageTool {
    pub fn new(kind: ImageToolKind) -> Self {
        Self {
            program: PathBuf::from(kind.program()),
            kind,
        }
    }

    /// `<tool> <input> -coalesce <pattern>`: writes every composited frame as a numbered file.
    pub fn coalesce(&self, input: &Path, frame_pattern: &Path) -> ToolInvocation {
        ToolInvocation::new(self.program.to_string_lossy())
            .path_arg(input)
            .arg("-coalesce")
            .path_arg(frame_pattern)
    }
}

/// Tools found by [`preflight`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub transcoder: PathBuf,
    pub image_tool: Option<ImageTool>,
}

impl Toolchain {
    pub fn transcoder(&self) -> ToolInvocation {
        ToolInvocation::new(self.transcoder.to_string_lossy())
    }
}

/// Locates the external tools once at program entry.
pub fn preflight() -> Result<Toolchain> {
    preflight_with(|name| which::which(name).ok())
}

/// [`preflight`] with an injectable lookup.
pub fn preflight_with<F>(lookup: F) -> Result<Toolchain>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let transcoder = lookup(TRANSCODER).ok_or_else(|| ConvertError::ToolNotFound {
        tool: TRANSCODER.to_string(),
        hint: TRANSCODER_HINT.to_string(),
    })?;
    debug!(path = ?transcoder, "Found transcoder");

    let image_tool = [ImageToolKind::Magick, ImageToolKind::Convert]
        .into_iter()
        .find_map(|kind| lookup(kind.program()).map(|program| ImageTool { program, kind }));

    match &image_tool {
        Some(tool) => debug!(path = ?tool.program, "Found image tool"),
        None => warn!(
            "ImageMagick (convert) not found. Some animated WebP files might not convert properly."
        ),
    }

    Ok(Toolchain {
        transcoder,
        image_tool,
    })
}
