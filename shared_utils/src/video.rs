//! Video dimension utilities
//!
//! libx264 with yuv420p rejects odd widths and heights. The policy here is to
//! round an odd side up by one pixel and resample with lanczos; when the size
//! is unknown, ffmpeg truncates both sides to even values at encode time.

use std::fmt;
use std::path::Path;

use crate::errors::{ConvertError, Result};

/// Filter used when the source size could not be probed.
pub const EVEN_TRUNCATE_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// `None` when either side is zero, which callers treat as "unknown".
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn to_even(self) -> Self {
        Self {
            width: make_even(self.width),
            height: make_even(self.height),
        }
    }

    pub fn needs_correction(self) -> bool {
        self.to_even() != self
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rounds an odd side up to the next even value.
///
/// `u32::MAX` has no even successor and is rounded down instead.
pub fn make_even(n: u32) -> u32 {
    if n.is_multiple_of(2) {
        n
    } else {
        n.checked_add(1).unwrap_or(n - 1)
    }
}

pub fn lanczos_scale_filter(target: Dimensions) -> String {
    format!("scale={}:{}:flags=lanczos", target.width, target.height)
}

/// Scale filter needed to make `dims` encodable, or `None` if it already is.
pub fn correction_filter(dims: Dimensions) -> Option<String> {
    dims.needs_correction()
        .then(|| lanczos_scale_filter(dims.to_even()))
}

/// Reads width and height from the image header without decoding pixels.
pub fn probe_dimensions(path: &Path) -> Result<Dimensions> {
    let (width, height) =
        image::image_dimensions(path).map_err(|e| ConvertError::DimensionProbe {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Dimensions::new(width, height).ok_or_else(|| ConvertError::DimensionProbe {
        path: path.to_path_buf(),
        reason: format!("image reports empty size {}x{}", width, height),
    })
}
