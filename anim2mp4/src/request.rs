//! Conversion request and fixed encode settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use shared_utils::ToolInvocation;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_BITRATE: &str = "2M";

/// Which conversion path(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Method {
    /// Direct first, frame extraction only if it fails.
    #[default]
    Auto,
    Direct,
    Extract,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Auto => "auto",
            Method::Direct => "direct",
            Method::Extract => "extract",
        })
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Method::Auto),
            "direct" => Ok(Method::Direct),
            "extract" => Ok(Method::Extract),
            other => Err(format!(
                "unknown method '{}' (expected auto, direct or extract)",
                other
            )),
        }
    }
}

/// Encoder parameters shared by both conversion paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub codec: &'static str,
    pub pixel_format: &'static str,
    pub preset: &'static str,
    pub movflags: &'static str,
    pub extension: &'static str,
}

pub const ENCODE: EncodeSettings = EncodeSettings {
    codec: "libx264",
    pixel_format: "yuv420p",
    preset: "medium",
    movflags: "+faststart",
    extension: "mp4",
};

impl EncodeSettings {
    /// `-c:v <codec> -pix_fmt <fmt>`
    pub fn codec_args(&self, inv: ToolInvocation) -> ToolInvocation {
        inv.args(["-c:v", self.codec, "-pix_fmt", self.pixel_format])
    }

    /// `-preset <preset> -movflags +faststart -y <output>`
    pub fn output_args(&self, inv: ToolInvocation, output: &Path) -> ToolInvocation {
        inv.args(["-preset", self.preset, "-movflags", self.movflags, "-y"])
            .path_arg(output)
    }
}

/// One conversion: where from, where to, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub fps: u32,
    pub bitrate: String,
    pub verbose: bool,
    pub method: Method,
    /// Parent of the per-attempt scratch directory; system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = default_output_path(&input);
        Self {
            input,
            output,
            fps: DEFAULT_FPS,
            bitrate: DEFAULT_BITRATE.to_string(),
            verbose: false,
            method: Method::Auto,
            scratch_root: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }
}

/// `clip.webp` → `clip.mp4`; a path without extension gets `.mp4` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(ENCODE.extension)
}
