//! External process execution for ffmpeg and ImageMagick.
//!
//! Every external tool call goes through [`ToolRunner`]. The production
//! implementation, [`SystemRunner`], starts the process once and blocks until it
//! exits; in verbose mode the child's stdout/stderr are inherited so output
//! streams live to the console, otherwise both are captured for diagnostics.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::{SystemRunner, ToolInvocation, ToolRunner};
//!
//! let inv = ToolInvocation::new("ffmpeg").args(["-i", "in.webp", "out.mp4"]);
//! let outcome = SystemRunner::new(false).run(&inv)?;
//! outcome.into_result(&inv)?;
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::logging::log_external_tool;

/// Makes a path safe to hand to ffmpeg, which has no `--` delimiter.
///
/// A relative path beginning with `-` gets a `./` prefix so it is not parsed as a flag.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{}", s))
    } else {
        s
    }
}

// ═══════════════════════════════════════════════════════════════
// ToolInvocation - program + argument list
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        let arg = safe_path_arg(path).into_owned();
        self.arg(arg)
    }

    /// True when `flag` is immediately followed by `value` in the argument list.
    pub fn has_flag_value(&self, flag: &str, value: &str) -> bool {
        self.args
            .windows(2)
            .any(|pair| pair[0] == flag && pair[1] == value)
    }

    /// Value following the first occurrence of `flag`.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
// Outcome / failure
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Combined stdout + stderr. Empty when the output was streamed to the console.
    pub output: String,
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn into_result(self, invocation: &ToolInvocation) -> Result<ProcessOutcome, ProcessFailure> {
        if self.success {
            Ok(self)
        } else {
            Err(ProcessFailure {
                command: invocation.to_string(),
                exit_code: self.exit_code,
                output: self.output,
            })
        }
    }
}

/// A non-zero exit from an external tool.
#[derive(Debug, Clone)]
pub struct ProcessFailure {
    pub command: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl ProcessFailure {
    pub fn suggestion(&self) -> Option<&'static str> {
        error_suggestion(&self.output)
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.command.split_whitespace().next().unwrap_or("process");
        match self.exit_code {
            Some(code) => write!(f, "{} exited with code {}", program, code)?,
            None => write!(f, "{} did not exit normally", program)?,
        }
        if self.output.trim().is_empty() {
            write!(f, " (see output above)")?;
        } else {
            write!(f, ": {}", format_ffmpeg_error(&self.output))?;
        }
        if let Some(suggestion) = self.suggestion() {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessFailure {}

// ═══════════════════════════════════════════════════════════════
// Runner seam
// ═══════════════════════════════════════════════════════════════

/// Runs one external tool invocation to completion.
///
/// `Err` means the process could not be started at all; a process that ran and
/// exited non-zero is reported through [`ProcessOutcome::success`].
pub trait ToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ProcessOutcome>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ProcessOutcome> {
        (**self).run(invocation)
    }
}

/// Runs `invocation` and folds both a failed spawn and a non-zero exit into [`ProcessFailure`].
pub fn run_checked<R: ToolRunner + ?Sized>(
    runner: &R,
    invocation: &ToolInvocation,
) -> Result<ProcessOutcome, ProcessFailure> {
    match runner.run(invocation) {
        Ok(outcome) => outcome.into_result(invocation),
        Err(e) => Err(ProcessFailure {
            command: invocation.to_string(),
            exit_code: None,
            output: format!("failed to start {}: {}", invocation.program, e),
        }),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ProcessOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());

        debug!(command = %invocation, verbose = self.verbose, "Executing external command");
        let start = Instant::now();

        let (status, output) = if self.verbose {
            let status = cmd
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()?;
            (status, String::new())
        } else {
            let out = cmd.output()?;
            (out.status, combine_output(&out.stdout, &out.stderr))
        };

        let outcome = ProcessOutcome {
            success: status.success(),
            exit_code: status.code(),
            output,
            duration: start.elapsed(),
        };
        log_external_tool(
            invocation,
            outcome.exit_code,
            &outcome.output,
            outcome.duration,
        );
        Ok(outcome)
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
        (false, true) => stdout.into_owned(),
        _ => stderr.into_owned(),
    }
}

// ═══════════════════════════════════════════════════════════════
// Error formatting
// ═══════════════════════════════════════════════════════════════

/// Picks the most meaningful line out of ffmpeg/ImageMagick output.
///
/// The last line mentioning an error wins; otherwise the last non-empty line
/// that is not a progress report; otherwise a placeholder.
pub fn format_ffmpeg_error(output: &str) -> String {
    if let Some(error_line) = output
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    output
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

pub fn error_suggestion(output: &str) -> Option<&'static str> {
    const PATTERNS: &[(&str, &str)] = &[
        ("No such file or directory", "check that the input path is correct"),
        ("Invalid data found", "the input may be corrupt or an unsupported animated variant; try -method extract"),
        ("Unknown encoder", "install an ffmpeg build with libx264"),
        ("Permission denied", "check read/write permissions"),
        ("height not divisible by 2", "the source has odd dimensions"),
        ("width not divisible by 2", "the source has odd dimensions"),
        ("no decode delegate", "ImageMagick lacks WebP support (install libwebp)"),
    ];

    PATTERNS
        .iter()
        .find(|(pattern, _)| output.contains(pattern))
        .map(|(_, suggestion)| *suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_safe_path_arg() {
        assert_eq!(safe_path_arg(Path::new("anim.webp")), "anim.webp");
        assert_eq!(safe_path_arg(Path::new("/tmp/anim.webp")), "/tmp/anim.webp");
        assert_eq!(safe_path_arg(Path::new("-anim.webp")), "./-anim.webp");
    }

    #[test]
    fn test_invocation_display_and_lookup() {
        let inv = ToolInvocation::new("ffmpeg")
            .args(["-i", "in.webp"])
            .arg("-vf")
            .arg("scale=2:2:flags=lanczos")
            .path_arg(&PathBuf::from("-out.mp4"));
        assert_eq!(
            inv.to_string(),
            "ffmpeg -i in.webp -vf scale=2:2:flags=lanczos ./-out.mp4"
        );
        assert_eq!(inv.flag_value("-vf"), Some("scale=2:2:flags=lanczos"));
        assert!(inv.has_flag_value("-i", "in.webp"));
        assert!(!inv.has_flag_value("-i", "out.mp4"));
        assert_eq!(inv.flag_value("-r"), None);
    }

    #[test]
    fn test_outcome_into_result() {
        let inv = ToolInvocation::new("ffmpeg").arg("-y");
        let ok = ProcessOutcome {
            success: true,
            exit_code: Some(0),
            output: String::new(),
            duration: Duration::ZERO,
        };
        assert!(ok.into_result(&inv).is_ok());

        let failed = ProcessOutcome {
            success: false,
            exit_code: Some(1),
            output: "frame=  1\n[webp_pipe] Error: invalid chunk\n".to_string(),
            duration: Duration::ZERO,
        };
        let err = failed.into_result(&inv).unwrap_err();
        assert_eq!(err.command, "ffmpeg -y");
        assert_eq!(
            err.to_string(),
            "ffmpeg exited with code 1: [webp_pipe] Error: invalid chunk"
        );
    }

    #[test]
    fn test_failure_without_captured_output() {
        let failure = ProcessFailure {
            command: "ffmpeg -i a.webp a.mp4".to_string(),
            exit_code: None,
            output: String::new(),
        };
        assert_eq!(
            failure.to_string(),
            "ffmpeg did not exit normally (see output above)"
        );
    }

    #[test]
    fn test_format_ffmpeg_error_skips_progress() {
        let out = "Input #0, webp_pipe\nframe=  10 fps=0.0\nConversion aborted\nsize=  0kB\n";
        assert_eq!(format_ffmpeg_error(out), "Conversion aborted");
        assert_eq!(format_ffmpeg_error(""), "unknown error");
    }

    #[test]
    fn test_error_suggestion() {
        assert!(error_suggestion("in.webp: Invalid data found when processing input").is_some());
        assert!(error_suggestion("all good").is_none());
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output(b"", b"err\n"), "err\n");
        assert_eq!(combine_output(b"out\n", b""), "out\n");
        assert_eq!(combine_output(b"out\n", b"err\n"), "out\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_failure() {
        let runner = SystemRunner::new(false);
        let inv = ToolInvocation::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let outcome = runner.run(&inv).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.output.contains("boom"));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let runner = SystemRunner::new(false);
        let inv = ToolInvocation::new("definitely_not_a_real_tool_xyz");
        assert!(runner.run(&inv).is_err());

        let failure = run_checked(&runner, &inv).unwrap_err();
        assert_eq!(failure.exit_code, None);
        assert!(failure
            .to_string()
            .starts_with("definitely_not_a_real_tool_xyz did not exit normally: failed to start"));
    }
}
