//! Scripted tool runner for converter tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shared_utils::{ImageTool, ImageToolKind, ProcessOutcome, ToolInvocation, ToolRunner, Toolchain};

/// Which step of a conversion an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Direct,
    ExtractPrimary,
    ExtractFallback,
    Reassemble,
}

pub fn classify(inv: &ToolInvocation) -> Step {
    if inv.args.iter().any(|a| a == "-coalesce") {
        Step::ExtractFallback
    } else if inv.has_flag_value("-f", "webp_pipe") {
        Step::Direct
    } else if inv.args.iter().any(|a| a == "-framerate") {
        Step::Reassemble
    } else {
        Step::ExtractPrimary
    }
}

pub fn ok() -> ProcessOutcome {
    ProcessOutcome {
        success: true,
        exit_code: Some(0),
        output: String::new(),
        duration: Duration::from_millis(1),
    }
}

pub fn fail(output: &str) -> ProcessOutcome {
    ProcessOutcome {
        success: false,
        exit_code: Some(1),
        output: output.to_string(),
        duration: Duration::from_millis(1),
    }
}

/// Writes `count` PNG frames of `width`x`height` following a `frame_%03d.png` pattern.
pub fn write_frames(pattern: &Path, first: u32, count: u32, width: u32, height: u32) {
    let pattern = pattern.to_string_lossy();
    for i in first..first + count {
        let path = PathBuf::from(pattern.replace("%03d", &format!("{:03}", i)));
        image::RgbaImage::new(width, height).save(&path).unwrap();
    }
}

/// Frame pattern (last argument) of an extraction invocation.
pub fn output_pattern(inv: &ToolInvocation) -> PathBuf {
    PathBuf::from(inv.args.last().cloned().unwrap_or_default())
}

type Script = Box<dyn Fn(Step, &ToolInvocation) -> ProcessOutcome>;

/// Records every invocation and answers with a scripted outcome.
pub struct ScriptedRunner {
    script: Script,
    pub calls: RefCell<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    pub fn new(script: impl Fn(Step, &ToolInvocation) -> ProcessOutcome + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls.borrow().iter().map(classify).collect()
    }

    pub fn call(&self, step: Step) -> Option<ToolInvocation> {
        self.calls
            .borrow()
            .iter()
            .find(|inv| classify(inv) == step)
            .cloned()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ProcessOutcome> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok((self.script)(classify(invocation), invocation))
    }
}

pub fn toolchain() -> Toolchain {
    Toolchain {
        transcoder: PathBuf::from("ffmpeg"),
        image_tool: Some(ImageTool::new(ImageToolKind::Convert)),
    }
}

pub fn toolchain_without_imagemagick() -> Toolchain {
    Toolchain {
        transcoder: PathBuf::from("ffmpeg"),
        image_tool: None,
    }
}
