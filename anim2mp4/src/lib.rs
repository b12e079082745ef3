//! anim2mp4 - Animated WebP to MP4 conversion
//!
//! Two ways to produce an H.264 MP4 from an animated image:
//! - Direct: a single ffmpeg run reading the source through `webp_pipe`
//! - Extraction: split into PNG frames (ffmpeg, then ImageMagick `-coalesce`),
//!   then reassemble the frames at the requested frame rate
//!
//! `auto` tries the direct path first and falls back to extraction.
//!
//! ```rust,ignore
//! use anim2mp4::{ConversionRequest, Converter, Method};
//! use shared_utils::{preflight, SystemRunner};
//!
//! let tools = preflight()?;
//! let request = ConversionRequest::new("anim.webp").with_method(Method::Auto);
//! Converter::new(SystemRunner::new(false), tools).convert(&request)?;
//! ```

pub mod cli;
pub mod direct;
pub mod extraction;
pub mod request;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use direct::convert_directly;
pub use extraction::{convert_via_extraction, FrameSet};
pub use request::{ConversionRequest, Method};
pub use strategy::{ConversionPath, Converted, Converter, StrategyFailure};
