//! Frame-extraction conversion
//!
//! Split the source into numbered PNG frames inside a private scratch
//! directory, measure the first frame, then encode the frame sequence. Slower
//! than the direct path but copes with animated WebP files that ffmpeg's
//! `webp_pipe` demuxer rejects, and falls back to ImageMagick's `-coalesce`
//! when ffmpeg cannot split the file either.
//!
//! The scratch directory is a [`TempDir`]: it is removed when this module's
//! entry point returns, on every path.

use std::fs;
use std::path::{Path, PathBuf};

use shared_utils::{
    correction_filter, probe_dimensions, run_checked, ConvertError, Result, ToolInvocation,
    ToolRunner, Toolchain,
};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::request::{ConversionRequest, ENCODE};

pub const SCRATCH_PREFIX: &str = "anim2mp4_";
pub const FRAME_PATTERN: &str = "frame_%03d.png";
const FRAME_PREFIX: &str = "frame_";
const FRAME_SUFFIX: &str = ".png";

/// Extracted frames in temporal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<PathBuf>,
}

impl FrameSet {
    /// Collects `frame_<n>.png` files in `dir`, sorted by `n` ascending.
    pub fn collect(dir: &Path) -> std::io::Result<Self> {
        let mut numbered: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter_map(|p| frame_number(&p).map(|n| (n, p)))
            .collect();
        numbered.sort_by_key(|(n, _)| *n);

        Ok(Self {
            frames: numbered.into_iter().map(|(_, p)| p).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&Path> {
        self.frames.first().map(PathBuf::as_path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.frames
    }
}

fn frame_number(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix(FRAME_PREFIX)?.strip_suffix(FRAME_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn new_scratch_dir(request: &ConversionRequest) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    match &request.scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(ConvertError::ScratchDir)
}

pub fn primary_extract_invocation(tools: &Toolchain, input: &Path, pattern: &Path) -> ToolInvocation {
    tools
        .transcoder()
        .arg("-i")
        .path_arg(input)
        .args(["-vsync", "0"])
        .path_arg(pattern)
}

pub fn reassemble_invocation(
    tools: &Toolchain,
    request: &ConversionRequest,
    pattern: &Path,
    filter: Option<String>,
) -> ToolInvocation {
    let inv = tools
        .transcoder()
        .arg("-framerate")
        .arg(request.fps.to_string())
        .arg("-i")
        .path_arg(pattern);
    let mut inv = ENCODE
        .codec_args(inv)
        .arg("-b:v")
        .arg(request.bitrate.as_str());

    if let Some(filter) = filter {
        inv = inv.arg("-vf").arg(filter);
    }

    ENCODE.output_args(inv, &request.output)
}

/// ffmpeg first, then ImageMagick `-coalesce` if one was found at startup.
fn extract_frames<R: ToolRunner + ?Sized>(
    runner: &R,
    tools: &Toolchain,
    input: &Path,
    pattern: &Path,
) -> Result<()> {
    let primary = primary_extract_invocation(tools, input, pattern);
    debug!("Extracting frames: {}", primary);

    let primary_failure = match run_checked(runner, &primary) {
        Ok(_) => return Ok(()),
        Err(failure) => failure,
    };

    let Some(image_tool) = &tools.image_tool else {
        return Err(ConvertError::ExtractionFailed {
            primary: primary_failure,
            fallback: None,
        });
    };

    debug!("FFmpeg extraction failed, trying ImageMagick...");
    let fallback = image_tool.coalesce(input, pattern);
    debug!("Extracting frames: {}", fallback);

    run_checked(runner, &fallback)
        .map(|_| ())
        .map_err(|failure| ConvertError::ExtractionFailed {
            primary: primary_failure,
            fallback: Some(failure),
        })
}

pub fn convert_via_extraction<R: ToolRunner + ?Sized>(
    runner: &R,
    tools: &Toolchain,
    request: &ConversionRequest,
) -> Result<()> {
    let scratch = new_scratch_dir(request)?;
    debug!("Extracting frames to: {}", scratch.path().display());

    let pattern = scratch.path().join(FRAME_PATTERN);
    extract_frames(runner, tools, &request.input, &pattern)?;

    let frames = FrameSet::collect(scratch.path())?;
    let Some(first) = frames.first() else {
        return Err(ConvertError::NoFramesExtracted(request.input.clone()));
    };
    debug!("Extracted {} frames", frames.len());

    let dims = probe_dimensions(first)?;
    debug!("Frame dimensions: {}", dims);
    let filter = correction_filter(dims);
    if filter.is_some() {
        debug!(
            "Adjusted dimensions: {} (made even for h264 compatibility)",
            dims.to_even()
        );
    }

    let invocation = reassemble_invocation(tools, request, &pattern, filter);
    info!(
        frames = frames.len(),
        output = %request.output.display(),
        "Creating video from extracted frames"
    );
    debug!("Creating video: {}", invocation);
    run_checked(runner, &invocation).map_err(ConvertError::VideoCreationFailed)?;

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
    }
    Ok(())
}
