//! Strategy selection
//!
//! `direct` and `extract` run one path and report its result. `auto` runs the
//! direct path and, only when it fails, the extraction path; the direct error
//! is then kept for diagnostics but the extraction result is what counts.

use shared_utils::{ConvertError, ToolRunner, Toolchain};
use thiserror::Error;
use tracing::{debug, info};

use crate::direct::convert_directly;
use crate::extraction::convert_via_extraction;
use crate::request::{ConversionRequest, Method};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPath {
    Direct,
    Extraction,
}

/// A successful conversion.
#[derive(Debug)]
pub struct Converted {
    pub path: ConversionPath,
    /// Set when `auto` mode recovered from a direct-path failure.
    pub direct_error: Option<ConvertError>,
}

/// A failed conversion, tagged with the path that failed last.
#[derive(Error, Debug)]
pub enum StrategyFailure {
    /// The request was refused before any external tool ran.
    #[error(transparent)]
    Rejected(ConvertError),

    #[error(transparent)]
    Direct(ConvertError),

    #[error("{error}")]
    Extraction {
        /// Direct-path error discarded by `auto` mode.
        direct: Option<ConvertError>,
        error: ConvertError,
    },
}

impl StrategyFailure {
    /// The error that decided the outcome.
    pub fn error(&self) -> &ConvertError {
        match self {
            StrategyFailure::Rejected(e) | StrategyFailure::Direct(e) => e,
            StrategyFailure::Extraction { error, .. } => error,
        }
    }
}

pub struct Converter<R> {
    runner: R,
    tools: Toolchain,
}

impl<R: ToolRunner> Converter<R> {
    pub fn new(runner: R, tools: Toolchain) -> Self {
        Self { runner, tools }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn convert(&self, request: &ConversionRequest) -> Result<Converted, StrategyFailure> {
        if !request.input.exists() {
            return Err(StrategyFailure::Rejected(ConvertError::InputNotFound(
                request.input.clone(),
            )));
        }

        info!(
            input = %request.input.display(),
            output = %request.output.display(),
            method = %request.method,
            fps = request.fps,
            bitrate = %request.bitrate,
            "Starting conversion"
        );

        match request.method {
            Method::Direct => self.direct(request).map_err(StrategyFailure::Direct),
            Method::Extract => self
                .extraction(request, None)
                .map_err(|(direct, error)| StrategyFailure::Extraction { direct, error }),
            Method::Auto => match self.direct(request) {
                Ok(converted) => Ok(converted),
                Err(e) => {
                    debug!("Direct conversion failed, trying frame extraction method: {}", e);
                    self.extraction(request, Some(e))
                        .map_err(|(direct, error)| StrategyFailure::Extraction { direct, error })
                }
            },
        }
    }

    fn direct(&self, request: &ConversionRequest) -> Result<Converted, ConvertError> {
        convert_directly(&self.runner, &self.tools, request)?;
        Ok(Converted {
            path: ConversionPath::Direct,
            direct_error: None,
        })
    }

    fn extraction(
        &self,
        request: &ConversionRequest,
        direct_error: Option<ConvertError>,
    ) -> Result<Converted, (Option<ConvertError>, ConvertError)> {
        match convert_via_extraction(&self.runner, &self.tools, request) {
            Ok(()) => Ok(Converted {
                path: ConversionPath::Extraction,
                direct_error,
            }),
            Err(e) => Err((direct_error, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fail, ok, output_pattern, toolchain, write_frames, ScriptedRunner, Step};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(dir: &TempDir, method: Method) -> ConversionRequest {
        let scratch = dir.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let input = dir.path().join("anim.webp");
        fs::write(&input, b"RIFF").unwrap();
        ConversionRequest::new(input)
            .with_method(method)
            .with_scratch_root(scratch)
    }

    /// Direct path outcome is `direct`; extraction writes two 4x4 frames and succeeds.
    fn runner(direct: fn() -> shared_utils::ProcessOutcome) -> ScriptedRunner {
        ScriptedRunner::new(move |step, inv| match step {
            Step::Direct => direct(),
            Step::ExtractPrimary => {
                write_frames(&output_pattern(inv), 1, 2, 4, 4);
                ok()
            }
            _ => ok(),
        })
    }

    #[test]
    fn test_missing_input_is_rejected_before_any_tool_runs() {
        let dir = TempDir::new().unwrap();
        let req = ConversionRequest::new(dir.path().join("missing.webp"));
        let converter = Converter::new(runner(ok), toolchain());

        let err = converter.convert(&req).unwrap_err();

        assert!(matches!(
            err,
            StrategyFailure::Rejected(ConvertError::InputNotFound(_))
        ));
        assert!(err.to_string().starts_with("input file does not exist"));
        assert!(converter.runner().calls.borrow().is_empty());
    }

    #[test]
    fn test_auto_direct_success_never_extracts() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Auto);
        let converter = Converter::new(runner(ok), toolchain());

        let converted = converter.convert(&req).unwrap();

        assert_eq!(converted.path, ConversionPath::Direct);
        assert!(converted.direct_error.is_none());
        assert_eq!(converter.runner().steps(), vec![Step::Direct]);
    }

    #[test]
    fn test_auto_falls_back_exactly_once() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Auto);
        let converter = Converter::new(runner(|| fail("Error: webp_pipe")), toolchain());

        let converted = converter.convert(&req).unwrap();

        assert_eq!(converted.path, ConversionPath::Extraction);
        assert!(matches!(
            converted.direct_error,
            Some(ConvertError::TranscodeFailed(_))
        ));
        assert_eq!(
            converter.runner().steps(),
            vec![Step::Direct, Step::ExtractPrimary, Step::Reassemble]
        );
    }

    #[test]
    fn test_auto_both_fail_surfaces_extraction_error() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Auto);
        let converter = Converter::new(
            ScriptedRunner::new(|step, _| match step {
                Step::Direct => fail("Error: webp_pipe"),
                _ => ok(),
            }),
            toolchain(),
        );

        let err = converter.convert(&req).unwrap_err();

        match &err {
            StrategyFailure::Extraction { direct, error } => {
                assert!(matches!(direct, Some(ConvertError::TranscodeFailed(_))));
                assert!(matches!(error, ConvertError::NoFramesExtracted(_)));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
        assert!(err.to_string().starts_with("no frames extracted"));
        assert!(matches!(err.error(), ConvertError::NoFramesExtracted(_)));
    }

    #[test]
    fn test_direct_mode_never_extracts() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Direct);
        let converter = Converter::new(runner(|| fail("Error: webp_pipe")), toolchain());

        let err = converter.convert(&req).unwrap_err();

        assert!(matches!(err, StrategyFailure::Direct(ConvertError::TranscodeFailed(_))));
        assert_eq!(converter.runner().steps(), vec![Step::Direct]);
    }

    #[test]
    fn test_extract_mode_uses_requested_fps_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Extract).with_fps(15);
        let converter = Converter::new(runner(ok), toolchain());

        let converted = converter.convert(&req).unwrap();

        assert_eq!(converted.path, ConversionPath::Extraction);
        assert!(converted.direct_error.is_none());
        let steps = converter.runner().steps();
        assert!(!steps.contains(&Step::Direct));
        let reassemble = converter.runner().call(Step::Reassemble).unwrap();
        assert_eq!(reassemble.flag_value("-framerate"), Some("15"));
        assert_eq!(
            reassemble.args.last().map(PathBuf::from),
            Some(dir.path().join("anim.mp4"))
        );
        let scratch_entries = fs::read_dir(dir.path().join("scratch")).unwrap().count();
        assert_eq!(scratch_entries, 0);
    }

    #[test]
    fn test_extract_mode_failure_has_no_direct_error() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, Method::Extract);
        let converter = Converter::new(ScriptedRunner::new(|_, _| ok()), toolchain());

        let err = converter.convert(&req).unwrap_err();
        assert!(matches!(err, StrategyFailure::Extraction { direct: None, .. }));
    }
}
