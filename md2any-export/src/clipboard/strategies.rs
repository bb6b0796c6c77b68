//! The built-in clipboard methods

use super::scaffold::Scaffold;
use super::{ClipboardMethod, ClipboardStrategy, StrategyResult};
use crate::payload::ClipboardPayload;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use which::which;

/// How long the rich strategy waits for a clipboard manager to take over on X11/Wayland.
pub const DEFAULT_RICH_HOLD: Duration = Duration::from_millis(500);

/// An external clipboard utility that reads the content from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CopyCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line such as `xclip -t text/html -i`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// Full path of the program, if it is installed.
    pub fn locate(&self) -> Option<PathBuf> {
        which(&self.program).ok()
    }

    fn run(&self, program: &Path, scaffold: &Scaffold) -> Result<(), String> {
        let stdin = scaffold
            .reader()
            .map_err(|e| format!("cannot reopen {}: {e}", scaffold.path().display()))?;
        let status = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("failed to launch {self}: {e}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{self} exited with {status}"))
        }
    }
}

impl fmt::Display for CopyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Commands that accept an HTML target type.
pub fn default_html_commands() -> Vec<CopyCommand> {
    ["wl-copy --type text/html", "xclip -selection clipboard -t text/html -i"]
        .iter()
        .filter_map(|line| CopyCommand::parse(line))
        .collect()
}

/// Commands that copy plain text.
pub fn default_text_commands() -> Vec<CopyCommand> {
    [
        "wl-copy",
        "xclip -selection clipboard -i",
        "xsel --clipboard --input",
        "pbcopy",
        "clip",
    ]
    .iter()
    .filter_map(|line| CopyCommand::parse(line))
    .collect()
}

/// Materialize `contents` and feed it to the first installed command that succeeds.
fn copy_via_commands(
    commands: &[CopyCommand],
    contents: &str,
    suffix: &str,
    scaffold_dir: Option<&Path>,
) -> Result<(), String> {
    let installed: Vec<(&CopyCommand, PathBuf)> = commands
        .iter()
        .filter_map(|command| command.locate().map(|path| (command, path)))
        .collect();
    if installed.is_empty() {
        return Err("no copy command installed".to_string());
    }

    let scaffold = Scaffold::materialize(scaffold_dir, contents, suffix)
        .map_err(|e| format!("cannot create temporary file: {e}"))?;
    let mut errors = Vec::new();
    for (command, path) in installed {
        match command.run(&path, &scaffold) {
            Ok(()) => return Ok(()),
            Err(err) => {
                debug!("Copy command failed: {err}");
                errors.push(err);
            }
        }
    }
    Err(errors.join("; "))
}

/// Native structured clipboard: HTML with a plain-text alternative.
///
/// On Linux desktops the selection belongs to this process and is gone once the
/// `Clipboard` drops. The write only counts when a clipboard manager takes the
/// content over within `hold`; otherwise the chain moves on to a copy command,
/// whose helper process keeps serving the selection.
#[derive(Debug, Clone)]
pub struct RichApiStrategy {
    enabled: bool,
    hold: Duration,
}

impl RichApiStrategy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            hold: DEFAULT_RICH_HOLD,
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    ))]
    fn write_html(&self, clipboard: &mut arboard::Clipboard, payload: &ClipboardPayload) -> StrategyResult {
        use arboard::SetExtLinux;
        use std::time::Instant;

        let started = Instant::now();
        let written = clipboard
            .set()
            .wait_until(started + self.hold)
            .html(payload.rich_html.as_str(), Some(payload.plain_text.as_str()));
        match written {
            Ok(()) => ownership_outcome(started.elapsed(), self.hold),
            Err(e) => StrategyResult::Failure(format!("rich write rejected: {e}")),
        }
    }

    #[cfg(not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )))]
    fn write_html(&self, clipboard: &mut arboard::Clipboard, payload: &ClipboardPayload) -> StrategyResult {
        match clipboard.set_html(payload.rich_html.as_str(), Some(payload.plain_text.as_str())) {
            Ok(()) => StrategyResult::Success(ClipboardMethod::RichApi),
            Err(e) => StrategyResult::Failure(format!("rich write rejected: {e}")),
        }
    }
}

/// A held selection succeeded only if someone replaced it before the deadline.
#[cfg_attr(
    not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )),
    allow(dead_code)
)]
fn ownership_outcome(elapsed: Duration, hold: Duration) -> StrategyResult {
    if elapsed < hold {
        StrategyResult::Success(ClipboardMethod::RichApi)
    } else {
        StrategyResult::Failure(format!(
            "no clipboard manager took the selection within {}ms",
            hold.as_millis()
        ))
    }
}

impl ClipboardStrategy for RichApiStrategy {
    fn method(&self) -> ClipboardMethod {
        ClipboardMethod::RichApi
    }

    fn attempt(&self, payload: &ClipboardPayload) -> StrategyResult {
        if !self.enabled {
            return StrategyResult::Failure("disabled by configuration".to_string());
        }
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(e) => return StrategyResult::Failure(format!("clipboard unavailable: {e}")),
        };
        self.write_html(&mut clipboard, payload)
    }
}

/// Rich HTML through a hidden file and an HTML-aware copy command.
#[derive(Debug, Clone)]
pub struct EditableSurfaceStrategy {
    enabled: bool,
    commands: Vec<CopyCommand>,
    scaffold_dir: Option<PathBuf>,
}

impl EditableSurfaceStrategy {
    pub fn new(enabled: bool, commands: Vec<CopyCommand>, scaffold_dir: Option<PathBuf>) -> Self {
        Self {
            enabled,
            commands,
            scaffold_dir,
        }
    }
}

impl ClipboardStrategy for EditableSurfaceStrategy {
    fn method(&self) -> ClipboardMethod {
        ClipboardMethod::EditableSurface
    }

    fn attempt(&self, payload: &ClipboardPayload) -> StrategyResult {
        if !self.enabled {
            return StrategyResult::Failure("disabled by configuration".to_string());
        }
        match copy_via_commands(
            &self.commands,
            &payload.rich_html,
            ".html",
            self.scaffold_dir.as_deref(),
        ) {
            Ok(()) => StrategyResult::Success(ClipboardMethod::EditableSurface),
            Err(reason) => StrategyResult::Failure(reason),
        }
    }
}

/// Plain text only; formatting is lost.
#[derive(Debug, Clone)]
pub struct PlainTextStrategy {
    enabled: bool,
    commands: Vec<CopyCommand>,
    scaffold_dir: Option<PathBuf>,
}

impl PlainTextStrategy {
    pub fn new(enabled: bool, commands: Vec<CopyCommand>, scaffold_dir: Option<PathBuf>) -> Self {
        Self {
            enabled,
            commands,
            scaffold_dir,
        }
    }
}

impl ClipboardStrategy for PlainTextStrategy {
    fn method(&self) -> ClipboardMethod {
        ClipboardMethod::PlainText
    }

    fn attempt(&self, payload: &ClipboardPayload) -> StrategyResult {
        if !self.enabled {
            return StrategyResult::Failure("disabled by configuration".to_string());
        }
        match copy_via_commands(
            &self.commands,
            &payload.plain_text,
            ".txt",
            self.scaffold_dir.as_deref(),
        ) {
            Ok(()) => StrategyResult::Success(ClipboardMethod::PlainText),
            Err(reason) => StrategyResult::Failure(reason),
        }
    }
}
