//! Command line surface
//!
//! Flags keep the single-dash spelling users already script against
//! (`-i in.webp -fps 15 -method extract`). clap only understands single-dash
//! short flags, so multi-letter flags are rewritten to `--name` first.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use tracing::info;

use crate::request::{default_output_path, ConversionRequest, Method, DEFAULT_BITRATE, DEFAULT_FPS};

const LONG_FLAGS: &[&str] = &["fps", "method", "help", "version"];
const SHORT_FLAGS: &[&str] = &["i", "o", "b", "v", "h", "V"];
/// Flags whose next argument is a value, even if it starts with `-`.
const VALUE_FLAGS: &[&str] = &["-i", "-o", "-b", "--fps", "--method"];

#[derive(Parser, Debug, Clone)]
#[command(name = "anim2mp4")]
#[command(version, about = "Convert an animated WebP into an MP4 video", long_about = None)]
pub struct Cli {
    /// Input animated WebP file (required)
    #[arg(short = 'i', value_name = "INPUT", allow_hyphen_values = true)]
    pub input: Option<PathBuf>,

    /// Output MP4 file (defaults to the input name with .mp4)
    #[arg(short = 'o', value_name = "OUTPUT", allow_hyphen_values = true)]
    pub output: Option<PathBuf>,

    /// Frame rate for the output video
    #[arg(long = "fps", default_value_t = DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Video bitrate (e.g. 2M, 5M)
    #[arg(short = 'b', value_name = "BITRATE", default_value = DEFAULT_BITRATE, value_parser = parse_bitrate)]
    pub bitrate: String,

    /// Verbose output: stream ffmpeg/ImageMagick output and debug logging
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Conversion method
    #[arg(long = "method", value_enum, default_value_t = Method::Auto)]
    pub method: Method,
}

fn parse_bitrate(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return Err("bitrate must be a single token such as 2M or 800k".to_string());
    }
    Ok(s.to_string())
}

impl Cli {
    /// Parses process arguments after [`normalize_args`].
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// `None` when `-i` was not given.
    pub fn to_request(&self) -> Option<ConversionRequest> {
        let input = self.input.clone()?;
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&input));
        Some(
            ConversionRequest::new(input)
                .with_output(output)
                .with_fps(self.fps)
                .with_bitrate(self.bitrate.clone())
                .with_verbose(self.verbose)
                .with_method(self.method),
        )
    }
}

/// Usage text printed when `-i` is missing.
pub fn usage() -> String {
    format!(
        "Usage: anim2mp4 -i input.webp [-o output.mp4] [-fps 30] [-b 2M] [-v] [-method auto|direct|extract]\n\n{}",
        Cli::command().render_help()
    )
}

/// Full error chain of a failed run, recorded once in the log.
///
/// Logged at INFO so it lands in the log file; the caller prints the returned
/// line on stderr.
pub fn report_failure(err: &anyhow::Error) -> String {
    let message = format!("{:#}", err);
    info!(error = %message, "Conversion failed");
    message
}

/// Rewrites Go-style flags into what clap accepts.
///
/// `-fps 15` → `--fps 15`, `-method=extract` → `--method=extract`,
/// `--i x` → `-i x`. Values following a value-taking flag are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut expect_value = false;

    for (idx, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if idx == 0 || expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        let Some(rewritten) = rewrite_flag(text) else {
            continue;
        };
        expect_value = VALUE_FLAGS.contains(&rewritten.as_str());
        out.push(OsString::from(rewritten));
    }
    out
}

/// Go's `strconv.ParseBool` spellings.
fn parse_go_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// `None` drops the argument (`-v=false`).
fn rewrite_flag(arg: &str) -> Option<String> {
    let (dashes, body) = if let Some(rest) = arg.strip_prefix("--") {
        ("--", rest)
    } else if let Some(rest) = arg.strip_prefix('-') {
        ("-", rest)
    } else {
        return Some(arg.to_string());
    };

    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    };

    let prefix = if LONG_FLAGS.contains(&name) {
        "--"
    } else if SHORT_FLAGS.contains(&name) {
        "-"
    } else {
        dashes
    };

    let rewritten = match value {
        Some(value) if name == "v" => match parse_go_bool(value) {
            Some(true) => "-v".to_string(),
            Some(false) => return None,
            // left as is so clap reports it
            None => arg.to_string(),
        },
        // clap takes `-i=x` literally as the value "=x"; split it instead.
        Some(value) if prefix == "-" => format!("-{}{}", name, value),
        Some(value) => format!("{}{}={}", prefix, name, value),
        None => format!("{}{}", prefix, name),
    };
    Some(rewritten)
}
