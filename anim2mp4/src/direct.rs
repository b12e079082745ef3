//! Direct conversion: one ffmpeg run reading the animated source as a WebP pipe.

use shared_utils::{
    correction_filter, probe_dimensions, run_checked, ConvertError, Dimensions, Result,
    ToolInvocation, ToolRunner, Toolchain, EVEN_TRUNCATE_FILTER,
};
use tracing::{debug, info};

use crate::request::{ConversionRequest, ENCODE};

/// Filter for the encode: lanczos upscale for odd known sizes, none for even
/// ones, ffmpeg-side truncation when the size is unknown.
pub fn direct_filter(probed: Option<Dimensions>) -> Option<String> {
    match probed {
        Some(dims) => correction_filter(dims),
        None => Some(EVEN_TRUNCATE_FILTER.to_string()),
    }
}

pub fn direct_invocation(
    tools: &Toolchain,
    request: &ConversionRequest,
    probed: Option<Dimensions>,
) -> ToolInvocation {
    let inv = tools
        .transcoder()
        .args(["-f", "webp_pipe", "-i"])
        .path_arg(&request.input);
    let mut inv = ENCODE
        .codec_args(inv)
        .arg("-r")
        .arg(request.fps.to_string())
        .arg("-b:v")
        .arg(request.bitrate.as_str());

    if let Some(filter) = direct_filter(probed) {
        inv = inv.arg("-vf").arg(filter);
    }

    ENCODE.output_args(inv, &request.output)
}

pub fn convert_directly<R: ToolRunner + ?Sized>(
    runner: &R,
    tools: &Toolchain,
    request: &ConversionRequest,
) -> Result<()> {
    let probed = match probe_dimensions(&request.input) {
        Ok(dims) => Some(dims),
        Err(e) => {
            debug!(error = %e, "Dimension probe failed, letting ffmpeg truncate to even size");
            None
        }
    };

    if let Some(dims) = probed {
        debug!("Original dimensions: {}", dims);
        if dims.needs_correction() {
            debug!(
                "Adjusted dimensions: {} (made even for h264 compatibility)",
                dims.to_even()
            );
        }
    }

    let invocation = direct_invocation(tools, request, probed);
    info!(
        input = %request.input.display(),
        output = %request.output.display(),
        "Converting directly"
    );
    debug!("Running command: {}", invocation);

    run_checked(runner, &invocation).map_err(ConvertError::TranscodeFailed)?;
    Ok(())
}
