//! Data handed between the normalizer, the clipboard writer and the caller

use serde::Serialize;

/// What ends up on the clipboard: a rich representation plus a plain-text one.
///
/// `rich_html` is self-contained: every image is a data URI or a URL that was
/// deliberately kept, never a session handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardPayload {
    pub rich_html: String,
    pub plain_text: String,
}

impl ClipboardPayload {
    pub fn new(rich_html: impl Into<String>, plain_text: impl Into<String>) -> Self {
        Self {
            rich_html: rich_html.into(),
            plain_text: plain_text.into(),
        }
    }
}

/// Category of a degraded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A formula stayed in vector form.
    FormulaNotRasterized,
    /// A session image could not be read and was removed.
    ImageDropped,
    /// A remote image could not be embedded and stays linked.
    ImageRemoteUnreachable,
    /// A clipboard method was tried and failed.
    ClipboardMethodFailed,
}

/// One degraded item in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportWarning {
    pub kind: WarningKind,
    /// The formula label, image source or clipboard method involved.
    pub source: String,
    pub message: String,
}

impl ExportWarning {
    pub fn new(kind: WarningKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Per-export counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub formulas_rasterized: usize,
    pub formulas_kept: usize,
    pub images_embedded: usize,
    pub images_dropped: usize,
    pub images_kept_remote: usize,
}

/// Result of normalizing one rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedContent {
    /// The wrapped, self-contained fragment.
    pub html: String,
    pub plain_text: String,
    pub warnings: Vec<ExportWarning>,
    pub stats: NormalizeStats,
}

impl NormalizedContent {
    pub fn payload(&self) -> ClipboardPayload {
        ClipboardPayload::new(self.html.clone(), self.plain_text.clone())
    }
}

impl From<NormalizedContent> for ClipboardPayload {
    fn from(content: NormalizedContent) -> Self {
        ClipboardPayload::new(content.html, content.plain_text)
    }
}
