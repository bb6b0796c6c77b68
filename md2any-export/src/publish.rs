//! Export publishing pipeline.
//!
//! Ties normalization and delivery together. Use [`Exporter::export_to_clipboard`]
//! for "Copy for paste" style commands and [`Exporter::export_to_file`] to download
//! the same normalized content as a standalone HTML document.
//!
//! An exporter runs one export at a time; overlapping requests are rejected with
//! [`ExportError::ExportInProgress`] instead of racing each other for the
//! clipboard.

use crate::clipboard::{ClipboardMethod, ClipboardWriter};
use crate::dom::Snapshot;
use crate::error::{ExportError, Result};
use crate::normalize::ContentNormalizer;
use crate::payload::{ExportWarning, NormalizeStats, NormalizedContent, WarningKind};
use crate::style::escape_attr;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEFAULT_TITLE: &str = "md2any export";

/// What to export.
///
/// ```ignore
/// let request = ExportRequest::new(&rendered)
///     .with_page(&page)
///     .with_title("Release notes");
/// ```
#[derive(Clone, Copy)]
pub struct ExportRequest<'a> {
    /// The rendered fragment.
    pub html: &'a str,
    /// Optional snapshot of the whole page, for shared formula symbols.
    pub page: Option<&'a Snapshot>,
    /// Document title for file exports.
    pub title: Option<&'a str>,
}

impl<'a> ExportRequest<'a> {
    pub fn new(html: &'a str) -> Self {
        Self {
            html,
            page: None,
            title: None,
        }
    }

    pub fn with_page(mut self, page: &'a Snapshot) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Clipboard method used; `None` for file exports.
    pub method: Option<ClipboardMethod>,
    /// Written file, for file exports.
    pub output: Option<PathBuf>,
    pub warnings: Vec<ExportWarning>,
    #[serde(flatten)]
    pub stats: NormalizeStats,
}

impl ExportReport {
    /// Whether some content was kept in a degraded form (a vector formula or a
    /// linked remote image).
    pub fn is_partial(&self) -> bool {
        self.stats.formulas_kept > 0 || self.stats.images_kept_remote > 0
    }
}

/// Runs exports, one at a time.
pub struct Exporter {
    normalizer: ContentNormalizer,
    writer: Arc<ClipboardWriter>,
    in_flight: AtomicBool,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ContentNormalizer::default(), ClipboardWriter::default())
    }
}

impl Exporter {
    pub fn new(normalizer: ContentNormalizer, writer: ClipboardWriter) -> Self {
        Self {
            normalizer,
            writer: Arc::new(writer),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn normalizer(&self) -> &ContentNormalizer {
        &self.normalizer
    }

    /// Whether an export is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Normalize the request and put it on the clipboard.
    ///
    /// # Errors
    ///
    /// - [`ExportError::ExportInProgress`] when another export is running
    /// - [`ExportError::ClipboardExhausted`] when every clipboard method failed
    pub async fn export_to_clipboard(&self, request: ExportRequest<'_>) -> Result<ExportReport> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let content = self.normalize(&request).await?;
        let payload = content.payload();
        let writer = Arc::clone(&self.writer);
        let outcome = tokio::task::spawn_blocking(move || writer.write(&payload))
            .await
            .map_err(|e| ExportError::ClipboardExhausted {
                reasons: format!("clipboard task aborted: {e}"),
            })?;
        if !outcome.success {
            return Err(ExportError::ClipboardExhausted {
                reasons: outcome.reasons(),
            });
        }

        let mut warnings = content.warnings;
        warnings.extend(outcome.failures.iter().map(|failure| {
            ExportWarning::new(
                WarningKind::ClipboardMethodFailed,
                failure.method.as_str(),
                failure.reason.clone(),
            )
        }));
        info!("Export copied via {}", outcome.method);
        Ok(ExportReport {
            method: Some(outcome.method),
            output: None,
            warnings,
            stats: content.stats,
        })
    }

    /// Normalize the request and write it to `path` as a standalone HTML document.
    pub async fn export_to_file(
        &self,
        request: ExportRequest<'_>,
        path: impl AsRef<Path>,
    ) -> Result<ExportReport> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let content = self.normalize(&request).await?;
        let document = standalone_document(&content.html, request.title.unwrap_or(DEFAULT_TITLE));
        let path = path.as_ref().to_path_buf();
        tokio::fs::write(&path, document).await?;
        info!("Export written to {}", path.display());
        Ok(ExportReport {
            method: None,
            output: Some(path),
            warnings: content.warnings,
            stats: content.stats,
        })
    }

    async fn normalize(&self, request: &ExportRequest<'_>) -> Result<NormalizedContent> {
        self.normalizer
            .normalize_with_page(request.html, request.page)
            .await
    }
}

/// Marks the exporter busy for its lifetime.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::ExportInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Wrap a normalized fragment in a minimal HTML5 document.
pub fn standalone_document(fragment: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{}</title>\n</head>\n<body>\n{fragment}\n</body>\n</html>\n",
        escape_attr(title)
    )
}
