//! Shared Utilities for anim2mp4
//!
//! - External process execution with captured or streamed output
//! - Even-dimension policy and image-header probing
//! - External tool pre-flight (ffmpeg, ImageMagick)
//! - Error types and logging setup

pub mod errors;
pub mod ffmpeg_process;
pub mod logging;
pub mod tools;
pub mod video;

pub use errors::{ConvertError, Result};
pub use ffmpeg_process::{
    format_ffmpeg_error, run_checked, safe_path_arg, ProcessFailure, ProcessOutcome, SystemRunner,
    ToolInvocation, ToolRunner,
};
pub use tools::{preflight, ImageTool, ImageToolKind, Toolchain, TRANSCODER};
pub use video::{
    correction_filter, lanczos_scale_filter, make_even, probe_dimensions, Dimensions,
    EVEN_TRUNCATE_FILTER,
};
