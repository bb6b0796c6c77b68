//! Clipboard delivery with ordered fallbacks
//!
//! Paste targets and platforms differ in what they accept, so the payload is offered
//! through a fixed chain of methods, richest first:
//!
//! ```text
//! rich-api ──fail──► editable-surface ──fail──► plain-text ──fail──► none
//!    │ ok                  │ ok                     │ ok
//!    └─────────────────────┴────────────────────────┴──► done
//! ```
//!
//! The first method that succeeds ends the chain. Methods are never retried and a
//! failing method never stops the chain; its reason is logged and kept in the
//! [`ClipboardOutcome`].

mod scaffold;
mod strategies;

pub use scaffold::Scaffold;
pub use strategies::{
    default_html_commands, default_text_commands, CopyCommand, EditableSurfaceStrategy,
    PlainTextStrategy, RichApiStrategy, DEFAULT_RICH_HOLD,
};

use crate::payload::ClipboardPayload;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How the payload reached the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardMethod {
    RichApi,
    EditableSurface,
    PlainText,
    None,
}

impl ClipboardMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardMethod::RichApi => "rich-api",
            ClipboardMethod::EditableSurface => "editable-surface",
            ClipboardMethod::PlainText => "plain-text",
            ClipboardMethod::None => "none",
        }
    }
}

impl fmt::Display for ClipboardMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one method attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyResult {
    Success(ClipboardMethod),
    Failure(String),
}

/// One way of putting a payload on the clipboard.
pub trait ClipboardStrategy: Send + Sync {
    /// The method this strategy reports on success.
    fn method(&self) -> ClipboardMethod;

    /// Try once. Must not panic; any problem is a [`StrategyResult::Failure`].
    fn attempt(&self, payload: &ClipboardPayload) -> StrategyResult;
}

/// A method that was tried and failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub method: ClipboardMethod,
    pub reason: String,
}

/// Final state of a clipboard write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardOutcome {
    pub method: ClipboardMethod,
    pub success: bool,
    /// Methods tried before the successful one (all of them on failure).
    pub failures: Vec<AttemptFailure>,
}

impl ClipboardOutcome {
    /// Failure reasons as one line, e.g. `rich-api: disabled; plain-text: ...`.
    pub fn reasons(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.method, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Settings for the default method chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardOptions {
    pub rich_api: bool,
    /// How long a Linux rich write waits for a clipboard manager to take over.
    pub rich_api_hold: Duration,
    pub editable_surface: bool,
    pub plain_text: bool,
    pub html_commands: Vec<CopyCommand>,
    pub text_commands: Vec<CopyCommand>,
    /// Where temporary carrier files go; the system temp dir when `None`.
    pub scaffold_dir: Option<PathBuf>,
}

impl Default for ClipboardOptions {
    fn default() -> Self {
        Self {
            rich_api: true,
            rich_api_hold: DEFAULT_RICH_HOLD,
            editable_surface: true,
            plain_text: true,
            html_commands: default_html_commands(),
            text_commands: default_text_commands(),
            scaffold_dir: None,
        }
    }
}

/// Writes payloads to the clipboard through an ordered list of strategies.
pub struct ClipboardWriter {
    strategies: Vec<Box<dyn ClipboardStrategy>>,
}

impl Default for ClipboardWriter {
    fn default() -> Self {
        Self::new(&ClipboardOptions::default())
    }
}

impl ClipboardWriter {
    /// The standard chain: rich API, editable surface, plain text.
    pub fn new(options: &ClipboardOptions) -> Self {
        Self::with_strategies(vec![
            Box::new(RichApiStrategy::new(options.rich_api).with_hold(options.rich_api_hold)),
            Box::new(EditableSurfaceStrategy::new(
                options.editable_surface,
                options.html_commands.clone(),
                options.scaffold_dir.clone(),
            )),
            Box::new(PlainTextStrategy::new(
                options.plain_text,
                options.text_commands.clone(),
                options.scaffold_dir.clone(),
            )),
        ])
    }

    /// A custom chain, tried in the given order.
    pub fn with_strategies(strategies: Vec<Box<dyn ClipboardStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn methods(&self) -> Vec<ClipboardMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Offer `payload` to each strategy in order until one succeeds.
    pub fn write(&self, payload: &ClipboardPayload) -> ClipboardOutcome {
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            let method = strategy.method();
            debug!("Trying clipboard method {method}");
            match strategy.attempt(payload) {
                StrategyResult::Success(method) => {
                    info!("Copied to clipboard via {method}");
                    return ClipboardOutcome {
                        method,
                        success: true,
                        failures,
                    };
                }
                StrategyResult::Failure(reason) => {
                    warn!("Clipboard method {method} failed: {reason}");
                    failures.push(AttemptFailure { method, reason });
                }
            }
        }
        ClipboardOutcome {
            method: ClipboardMethod::None,
            success: false,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Scripted {
        method: ClipboardMethod,
        succeed: bool,
        log: Arc<Mutex<Vec<ClipboardMethod>>>,
    }

    impl ClipboardStrategy for Scripted {
        fn method(&self) -> ClipboardMethod {
            self.method
        }

        fn attempt(&self, _payload: &ClipboardPayload) -> StrategyResult {
            self.log.lock().unwrap().push(self.method);
            if self.succeed {
                StrategyResult::Success(self.method)
            } else {
                StrategyResult::Failure(format!("{} refused", self.method))
            }
        }
    }

    fn chain(results: [bool; 3]) -> (ClipboardWriter, Arc<Mutex<Vec<ClipboardMethod>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let methods = [
            ClipboardMethod::RichApi,
            ClipboardMethod::EditableSurface,
            ClipboardMethod::PlainText,
        ];
        let strategies = methods
            .into_iter()
            .zip(results)
            .map(|(method, succeed)| {
                Box::new(Scripted {
                    method,
                    succeed,
                    log: log.clone(),
                }) as Box<dyn ClipboardStrategy>
            })
            .collect();
        (ClipboardWriter::with_strategies(strategies), log)
    }

    #[test]
    fn first_success_short_circuits() {
        let (writer, log) = chain([true, true, true]);
        let outcome = writer.write(&ClipboardPayload::new("<p>a</p>", "a"));
        assert_eq!(outcome.method, ClipboardMethod::RichApi);
        assert!(outcome.success);
        assert_eq!(*log.lock().unwrap(), vec![ClipboardMethod::RichApi]);
    }

    #[test]
    fn falls_back_in_order() {
        let (writer, log) = chain([false, false, true]);
        let outcome = writer.write(&ClipboardPayload::new("<p>a</p>", "a"));
        assert_eq!(outcome.method, ClipboardMethod::PlainText);
        assert_eq!(outcome.reasons(), "rich-api: rich-api refused; editable-surface: editable-surface refused");
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn exhausted_chain_reports_none() {
        let (writer, _) = chain([false, false, false]);
        let outcome = writer.write(&ClipboardPayload::new("", ""));
        assert_eq!(outcome.method, ClipboardMethod::None);
        assert!(!outcome.success);
        assert_eq!(outcome.failures.len(), 3);
    }

    #[test]
    fn method_names_on_the_wire() {
        let names: Vec<String> = [
            ClipboardMethod::RichApi,
            ClipboardMethod::EditableSurface,
            ClipboardMethod::PlainText,
            ClipboardMethod::None,
        ]
        .iter()
        .map(|m| serde_json::to_string(m).unwrap())
        .collect();
        assert_eq!(names, vec![r#""rich-api""#, r#""editable-surface""#, r#""plain-text""#, r#""none""#]);
    }

    #[test]
    fn default_chain_order() {
        assert_eq!(
            ClipboardWriter::default().methods(),
            vec![
                ClipboardMethod::RichApi,
                ClipboardMethod::EditableSurface,
                ClipboardMethod::PlainText
            ]
        );
    }
}
